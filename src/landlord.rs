pub mod tick;

use crate::eviction::{worker, Evicter};
use crate::node::{NodeFilter, NodeLister};
use crate::random::{shuffle_slice, RandomSource};
use crate::{actor, config};
use act_zero::runtimes::tokio::spawn_actor;
use act_zero::{call, Actor, ActorError, ActorResult, Addr, Produces};
use anyhow::Context;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Periodically picks random cluster nodes and requests their simulated eviction.
pub struct Landlord<R: RandomSource> {
    lister: Arc<dyn NodeLister>,
    evicter: Arc<dyn Evicter>,
    rand: R,
    filter: NodeFilter,
    min_evictions: usize,
    max_evictions: usize,
    interval: Duration,
}

/// What a single sweep decided. Dropping it detaches the workers.
#[derive(Debug)]
pub struct SweepOutcome {
    pub node_count: usize,
    pub eligible_count: usize,
    /// Names of the nodes handed to workers, in dispatch order.
    pub targets: Vec<String>,
    pub workers: Vec<JoinHandle<()>>,
}

impl<R: RandomSource> Landlord<R> {
    pub fn new(
        config: &config::Landlord,
        lister: Arc<dyn NodeLister>,
        evicter: Arc<dyn Evicter>,
        rand: R,
    ) -> Self {
        Self {
            lister,
            evicter,
            rand,
            filter: NodeFilter::from_config(config),
            min_evictions: config.min_evictions,
            max_evictions: config.max_evictions,
            interval: config.interval,
        }
    }

    /// Sweeps once per interval until `token` is cancelled.
    ///
    /// Workers that were already dispatched keep running after cancellation.
    pub async fn start(self, token: CancellationToken) {
        info!("Starting landlord with interval {:?}", self.interval);

        let interval = self.interval;
        let addr = spawn_actor(self);

        tick::tick(token, interval, move || {
            let addr = addr.clone();
            async move {
                // Sweep errors are logged by the actor's error handler.
                if call!(addr.sweep()).await.is_err() {
                    debug!("Sweep produced no result");
                }
            }
        })
        .await;

        info!("Stopped landlord");
    }

    /// Sweeps the cluster's nodes for eviction targets.
    #[tracing::instrument(name = "Landlord::sweep", skip(self))]
    pub async fn sweep(&mut self) -> ActorResult<()> {
        match self.sweep_nodes().await {
            Ok(_) => Produces::ok(()),
            Err(e) => Err(actor::Error::from(e).into()),
        }
    }

    async fn sweep_nodes(&mut self) -> anyhow::Result<SweepOutcome> {
        info!(
            "Sweeping nodes with min evictions {} and max evictions {}",
            self.min_evictions, self.max_evictions
        );
        let mut eviction_count = self.count();
        info!("Generated an eviction count of {}", eviction_count);

        let nodes = self
            .lister
            .list_nodes()
            .await
            .context("error listing nodes")?;
        let node_count = nodes.len();
        info!("Found {} nodes", node_count);

        let mut eligible = self.filter.filter(nodes);
        let eligible_count = eligible.len();
        info!("Filtered {} nodes to {}", node_count, eligible_count);

        if eviction_count > eligible_count {
            info!(
                "Eviction count ({}) is greater than the amount of filtered nodes ({}), setting eviction count to {}",
                eviction_count, eligible_count, eligible_count
            );
            eviction_count = eligible_count;
        }

        // Shuffle so the same nodes are not always first.
        shuffle_slice(&mut self.rand, &mut eligible);
        eligible.truncate(eviction_count);

        let mut targets = Vec::with_capacity(eviction_count);
        let mut workers = Vec::with_capacity(eviction_count);
        for node in eligible {
            let jitter = self.jitter();
            targets.push(node.name.clone());
            workers.push(worker::spawn(
                Arc::clone(&self.evicter),
                node,
                jitter,
                self.interval,
            ));
        }

        Ok(SweepOutcome {
            node_count,
            eligible_count,
            targets,
            workers,
        })
    }

    /// Number of nodes to evict, in `[min_evictions, max_evictions)`.
    ///
    /// Falls back to `min_evictions` when the range is empty.
    fn count(&mut self) -> usize {
        self.rand
            .int_bounded(self.max_evictions.saturating_sub(self.min_evictions))
            + self.min_evictions
    }

    fn jitter(&mut self) -> Duration {
        let millis = self.rand.int_bounded(self.interval.as_millis() as usize);

        Duration::from_millis(millis as u64)
    }
}

impl<R: RandomSource> fmt::Display for Landlord<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Landlord")
    }
}

impl<R: RandomSource> fmt::Debug for Landlord<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[async_trait]
impl<R: RandomSource> Actor for Landlord<R> {
    #[tracing::instrument(name = "Landlord::started", skip(self, _addr))]
    async fn started(&mut self, _addr: Addr<Self>) -> ActorResult<()>
    where
        Self: Sized,
    {
        info!("Started");
        Produces::ok(())
    }

    async fn error(&mut self, error: ActorError) -> bool {
        actor::handle_error(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eviction::worker::tests::{Behavior, RecordingEvicter, PROVIDER_ID};
    use crate::node::{ConditionStatus, Node, NodeCondition};
    use crate::random::tests::ScriptedRandom;
    use anyhow::anyhow;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::{HashMap, HashSet};

    struct StaticLister(Vec<Node>);

    #[async_trait]
    impl NodeLister for StaticLister {
        async fn list_nodes(&self) -> anyhow::Result<Vec<Node>> {
            Ok(self.0.clone())
        }
    }

    struct FailingLister;

    #[async_trait]
    impl NodeLister for FailingLister {
        async fn list_nodes(&self) -> anyhow::Result<Vec<Node>> {
            Err(anyhow!("the server has asked for the client to provide credentials"))
        }
    }

    fn node(name: &str) -> Node {
        Node {
            name: name.into(),
            provider_id: PROVIDER_ID.into(),
            conditions: vec![],
        }
    }

    fn nodes(count: usize) -> Vec<Node> {
        (0..count).map(|i| node(&format!("aks-spot-{}", i))).collect()
    }

    fn landlord_config(min_evictions: usize, max_evictions: usize) -> config::Landlord {
        config::Landlord {
            min_evictions,
            max_evictions,
            ..Default::default()
        }
    }

    fn landlord<R: RandomSource>(
        config: &config::Landlord,
        nodes: Vec<Node>,
        evicter: &Arc<RecordingEvicter>,
        rand: R,
    ) -> Landlord<R> {
        let evicter: Arc<dyn Evicter> = evicter.clone();
        Landlord::new(config, Arc::new(StaticLister(nodes)), evicter, rand)
    }

    async fn join(outcome: SweepOutcome) {
        for worker in outcome.workers {
            worker.await.unwrap();
        }
    }

    /// 10 nodes, 2 system pool nodes, 1 with a scheduled event and 2 without provider ID.
    fn scenario_nodes() -> Vec<Node> {
        let mut nodes = nodes(7);
        nodes[5].provider_id.clear();
        nodes[6].provider_id.clear();
        nodes.push(node("aks-syspool-0"));
        nodes.push(node("aks-syspool-1"));
        let mut flagged = node("aks-spot-flagged");
        flagged.conditions.push(NodeCondition {
            condition_type: "VMEventScheduled".into(),
            status: ConditionStatus::True,
        });
        nodes.push(flagged);
        nodes
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_scenario() -> anyhow::Result<()> {
        let config = landlord_config(5, 8);

        for seed in 0..50 {
            let evicter = Arc::new(RecordingEvicter::new(Behavior::Accept));
            let mut landlord =
                landlord(&config, scenario_nodes(), &evicter, StdRng::seed_from_u64(seed));

            let outcome = landlord.sweep_nodes().await?;

            assert_eq!(10, outcome.node_count);
            assert_eq!(7, outcome.eligible_count);
            assert!((5..=7).contains(&outcome.targets.len()));
            assert_eq!(outcome.targets.len(), outcome.workers.len());

            let unique: HashSet<_> = outcome.targets.iter().collect();
            assert_eq!(outcome.targets.len(), unique.len());
            for target in &outcome.targets {
                assert!(target.starts_with("aks-spot-"), "{}", target);
                assert_ne!("aks-spot-flagged", target);
            }

            let with_provider_id = outcome
                .targets
                .iter()
                .filter(|t| *t != "aks-spot-5" && *t != "aks-spot-6")
                .count();
            join(outcome).await;
            assert_eq!(with_provider_id, evicter.request_count());
        }

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_count_is_clamped_to_eligible_nodes() -> anyhow::Result<()> {
        let config = landlord_config(5, 20);
        let evicter = Arc::new(RecordingEvicter::new(Behavior::Accept));
        // count draw 14 -> 19 evictions wanted
        let rand = ScriptedRandom::new(vec![14]);
        let mut landlord = landlord(&config, nodes(3), &evicter, rand);

        let outcome = landlord.sweep_nodes().await?;

        assert_eq!(
            vec!["aks-spot-0", "aks-spot-1", "aks-spot-2"],
            outcome.targets
        );
        assert_eq!(vec![3], landlord.rand.shuffle_widths);
        join(outcome).await;
        assert_eq!(3, evicter.request_count());

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_shuffles_eligible_nodes_only() -> anyhow::Result<()> {
        let config = landlord_config(1, 5);
        let evicter = Arc::new(RecordingEvicter::new(Behavior::Accept));
        let mut all = nodes(4);
        all.insert(1, node("syspool-1"));
        // count draw 1 -> 2 evictions, then one jitter per worker
        let rand = ScriptedRandom::new(vec![1, 2_500, 9_999]);
        let mut landlord = landlord(&config, all, &evicter, rand);

        let outcome = landlord.sweep_nodes().await?;

        assert_eq!(5, outcome.node_count);
        assert_eq!(4, outcome.eligible_count);
        assert_eq!(vec![4], landlord.rand.shuffle_widths);
        assert_eq!(vec!["aks-spot-0", "aks-spot-1"], outcome.targets);

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_workers_are_jittered_within_interval() -> anyhow::Result<()> {
        let config = landlord_config(2, 3);
        let evicter = Arc::new(RecordingEvicter::new(Behavior::Accept));
        let rand = ScriptedRandom::new(vec![0, 4_000, 9_000]);
        let mut landlord = landlord(&config, nodes(2), &evicter, rand);
        let start = tokio::time::Instant::now();

        let outcome = landlord.sweep_nodes().await?;
        assert_eq!(0, evicter.request_count());

        tokio::time::sleep(Duration::from_millis(4_500)).await;
        assert_eq!(1, evicter.request_count());

        join(outcome).await;
        assert_eq!(2, evicter.request_count());
        assert!(start.elapsed() >= Duration::from_secs(9));
        assert!(start.elapsed() < config.interval);

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_listing_failure_aborts_sweep() {
        let config = landlord_config(5, 20);
        let evicter = Arc::new(RecordingEvicter::new(Behavior::Accept));
        let mut landlord = Landlord::new(
            &config,
            Arc::new(FailingLister),
            evicter.clone(),
            StdRng::seed_from_u64(1),
        );

        let result = landlord.sweep_nodes().await;

        let error = result.unwrap_err();
        assert_eq!("error listing nodes", error.to_string());
        assert_eq!(0, evicter.request_count());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_worker_does_not_affect_siblings() -> anyhow::Result<()> {
        let config = landlord_config(3, 4);
        let evicter = Arc::new(RecordingEvicter::new(Behavior::Accept));
        let mut all = nodes(3);
        all[1].provider_id = "azure:///not/a/scale/set".into();
        let mut landlord = landlord(&config, all, &evicter, StdRng::seed_from_u64(3));

        let outcome = landlord.sweep_nodes().await?;
        assert_eq!(3, outcome.targets.len());
        join(outcome).await;

        assert_eq!(2, evicter.request_count());

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_eligible_nodes() -> anyhow::Result<()> {
        let config = landlord_config(5, 20);
        let evicter = Arc::new(RecordingEvicter::new(Behavior::Accept));
        let mut landlord = landlord(
            &config,
            vec![node("syspool-0"), node("syspool-1")],
            &evicter,
            StdRng::seed_from_u64(1),
        );

        let outcome = landlord.sweep_nodes().await?;

        assert_eq!(2, outcome.node_count);
        assert_eq!(0, outcome.eligible_count);
        assert!(outcome.targets.is_empty());

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_bounds_hold_for_many_sweeps() -> anyhow::Result<()> {
        let config = landlord_config(5, 20);
        let evicter = Arc::new(RecordingEvicter::new(Behavior::Accept));
        let mut landlord = landlord(&config, nodes(12), &evicter, StdRng::seed_from_u64(42));

        for _ in 0..200 {
            let outcome = landlord.sweep_nodes().await?;

            assert!(outcome.targets.len() <= outcome.eligible_count);
            assert!(outcome.targets.len() < config.max_evictions);
            assert!(outcome.targets.len() >= config.min_evictions);
        }

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_seed_selects_same_nodes() -> anyhow::Result<()> {
        let config = landlord_config(2, 6);
        let evicter = Arc::new(RecordingEvicter::new(Behavior::Accept));
        let mut a = landlord(&config, nodes(20), &evicter, StdRng::seed_from_u64(9));
        let mut b = landlord(&config, nodes(20), &evicter, StdRng::seed_from_u64(9));

        for _ in 0..5 {
            assert_eq!(
                a.sweep_nodes().await?.targets,
                b.sweep_nodes().await?.targets
            );
        }

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_is_uniform() -> anyhow::Result<()> {
        let config = landlord_config(1, 2);
        let evicter = Arc::new(RecordingEvicter::new(Behavior::Accept));
        let mut landlord = landlord(&config, nodes(5), &evicter, StdRng::seed_from_u64(2024));
        let mut counts: HashMap<String, u32> = HashMap::new();
        let trials = 5_000;

        for _ in 0..trials {
            let outcome = landlord.sweep_nodes().await?;
            for target in outcome.targets {
                *counts.entry(target).or_default() += 1;
            }
        }

        assert_eq!(5, counts.len());
        let expected = trials / 5;
        for (name, count) in counts {
            let deviation = (count as i64 - expected as i64).abs();
            assert!(deviation < expected as i64 / 5, "{} selected {} times", name, count);
        }

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_inverted_bounds_evict_min_evictions() -> anyhow::Result<()> {
        let config = landlord_config(3, 1);
        let evicter = Arc::new(RecordingEvicter::new(Behavior::Accept));
        let mut landlord = landlord(&config, nodes(5), &evicter, StdRng::seed_from_u64(3));

        assert_eq!(3, landlord.count());
        let outcome = landlord.sweep_nodes().await?;
        assert_eq!(3, outcome.targets.len());
        join(outcome).await;

        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_sweeps_until_cancelled_and_keeps_workers() {
        let config = landlord_config(1, 2);
        let evicter = Arc::new(RecordingEvicter::new(Behavior::Accept));
        // per sweep: count draw, then a 5s jitter for the single node
        let rand = ScriptedRandom::new(vec![0, 5_000, 0, 5_000, 0, 5_000]);
        let landlord = landlord(&config, nodes(1), &evicter, rand);
        let token = CancellationToken::new();

        let running = tokio::spawn(landlord.start(token.clone()));

        // sweeps at 0s, 10s and 20s; workers of the first two are done
        tokio::time::sleep(Duration::from_millis(20_001)).await;
        assert_eq!(2, evicter.request_count());

        token.cancel();
        running.await.unwrap();

        // the third sweep's worker still fires at 25s, no fourth sweep runs
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(3, evicter.request_count());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_error_is_reported_to_actor() {
        let config = landlord_config(5, 20);
        let evicter = Arc::new(RecordingEvicter::new(Behavior::Accept));
        let mut landlord = Landlord::new(
            &config,
            Arc::new(FailingLister),
            evicter,
            StdRng::seed_from_u64(1),
        );

        let result = landlord.sweep().await;

        let error = result.err().unwrap();
        assert!(error.downcast_ref::<actor::Error>().is_some());
    }
}
