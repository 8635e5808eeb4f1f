use rand::Rng;

/// Source of bounded random integers and unbiased permutations.
///
/// Implemented for every [`rand::Rng`], so a seeded `StdRng` gives
/// reproducible sweeps.
pub trait RandomSource: Send + 'static {
    /// Returns an integer in `[0, n)`, or 0 when `n` is 0.
    fn int_bounded(&mut self, n: usize) -> usize;

    /// Permutes `n` elements by calling `swap(i, j)` for each transposition.
    fn shuffle(&mut self, n: usize, swap: &mut dyn FnMut(usize, usize));
}

impl<R> RandomSource for R
where
    R: Rng + Send + 'static,
{
    fn int_bounded(&mut self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }

        self.gen_range(0..n)
    }

    fn shuffle(&mut self, n: usize, swap: &mut dyn FnMut(usize, usize)) {
        // Fisher-Yates
        for i in (1..n).rev() {
            let j = self.gen_range(0..=i);
            swap(i, j);
        }
    }
}

/// Shuffles a slice in place through a [`RandomSource`].
pub fn shuffle_slice<T>(rand: &mut dyn RandomSource, items: &mut [T]) {
    rand.shuffle(items.len(), &mut |i, j| items.swap(i, j));
}
