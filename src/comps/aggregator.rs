use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error, warn};

use super::{Comp, Connector, Query};
use crate::geo::distance_km;

/// Fans a query out to every registered connector and merges the answers.
pub struct Aggregator {
    connectors: Vec<Arc<dyn Connector>>,
    timeout: Duration,
}

impl Aggregator {
    /// `timeout` bounds each connector call independently.
    pub fn new(connectors: Vec<Arc<dyn Connector>>, timeout: Duration) -> Self {
        Self {
            connectors,
            timeout,
        }
    }

    pub fn connector_count(&self) -> usize {
        self.connectors.len()
    }

    /// Collects comps from all sources, stamps provenance and distance to
    /// the subject, and drops comps known to lie beyond `radius_km`.
    ///
    /// A source that errors, times out or panics contributes nothing; the
    /// others are unaffected. Sources still running when the returned future
    /// is dropped are aborted. Comps whose distance is unknown are always
    /// kept. Results follow connector registration order.
    #[tracing::instrument(
        skip(self, query),
        fields(city = %query.city, property_type = %query.property_type, sources = self.connectors.len())
    )]
    pub async fn get_comps(
        &self,
        query: &Query,
        subject_lat: Option<f64>,
        subject_lon: Option<f64>,
        radius_km: Option<f64>,
    ) -> Vec<Comp> {
        // Dropping the set aborts every source still in flight.
        let mut tasks = JoinSet::new();
        let mut slots: Vec<Option<Vec<Comp>>> = vec![None; self.connectors.len()];
        let mut task_slots = HashMap::with_capacity(self.connectors.len());

        for (slot, connector) in self.connectors.iter().enumerate() {
            let connector = Arc::clone(connector);
            let query = query.clone();
            let timeout = self.timeout;

            let span = tracing::info_span!("search_source", source = %connector.name());

            let handle = tasks.spawn(
                async move {
                    match tokio::time::timeout(timeout, connector.search(&query)).await {
                        Ok(Ok(items)) => {
                            debug!(count = items.len(), "Source answered");
                            items
                        }
                        Ok(Err(e)) => {
                            warn!(error = %e, "Source failed, treating as empty");
                            Vec::new()
                        }
                        Err(_) => {
                            warn!(
                                timeout_ms = timeout.as_millis() as u64,
                                "Source timed out, treating as empty"
                            );
                            Vec::new()
                        }
                    }
                }
                .instrument(span),
            );

            task_slots.insert(handle.id(), slot);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, items)) => {
                    if let Some(&slot) = task_slots.get(&id) {
                        slots[slot] = Some(items);
                    }
                }
                Err(e) => {
                    let source = task_slots
                        .get(&e.id())
                        .map_or("?", |&slot| self.connectors[slot].name());
                    error!(source, error = %e, "Source task aborted, treating as empty");
                }
            }
        }

        let mut all = Vec::new();
        for (connector, items) in self.connectors.iter().zip(slots) {
            let name = connector.name();
            all.extend(items.unwrap_or_default().into_iter().map(|mut item| {
                if item.source.is_none() {
                    item.source = Some(name.to_string());
                }
                item
            }));
        }

        for item in &mut all {
            item.distance_km = match (subject_lat, subject_lon, item.coordinates()) {
                (Some(s_lat), Some(s_lon), Some((lat, lon))) => {
                    Some(distance_km(s_lat, s_lon, lat, lon))
                }
                _ => None,
            };
        }

        let merged = all.len();
        if let Some(radius) = radius_km {
            all.retain(|item| item.distance_km.is_none_or(|d| d <= radius));
        }

        debug!(merged, kept = all.len(), ?radius_km, "Comps aggregated");
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comps::sources::EmptyConnector;
    use crate::subject::PropertyType;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    const CONTAGEM: (f64, f64) = (-19.931, -44.053);
    const BETIM: (f64, f64) = (-19.966, -44.196);
    const VESPASIANO: (f64, f64) = (-19.689, -43.923);

    struct Fixed {
        name: &'static str,
        comps: Vec<Comp>,
    }

    #[async_trait]
    impl Connector for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn search(&self, _query: &Query) -> Result<Vec<Comp>> {
            Ok(self.comps.clone())
        }
    }

    struct Failing;

    #[async_trait]
    impl Connector for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        async fn search(&self, _query: &Query) -> Result<Vec<Comp>> {
            anyhow::bail!("portal unreachable")
        }
    }

    struct Panicking;

    #[async_trait]
    impl Connector for Panicking {
        fn name(&self) -> &str {
            "panicking"
        }

        async fn search(&self, _query: &Query) -> Result<Vec<Comp>> {
            panic!("malformed payload")
        }
    }

    struct Slow;

    #[async_trait]
    impl Connector for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        async fn search(&self, _query: &Query) -> Result<Vec<Comp>> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(vec![comp_at("late", None)])
        }
    }

    fn comp_at(id: &str, at: Option<(f64, f64)>) -> Comp {
        Comp {
            id: Some(id.to_string()),
            lat: at.map(|(lat, _)| lat),
            lon: at.map(|(_, lon)| lon),
            ..Default::default()
        }
    }

    fn query() -> Query {
        Query {
            city: "Contagem".to_string(),
            state: "MG".to_string(),
            country: "BR".to_string(),
            property_type: PropertyType::Galpao,
        }
    }

    fn ids(comps: &[Comp]) -> Vec<&str> {
        comps.iter().map(|c| c.id.as_deref().unwrap()).collect()
    }

    fn aggregator(connectors: Vec<Arc<dyn Connector>>) -> Aggregator {
        Aggregator::new(connectors, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn test_failing_source_does_not_block_others() {
        let agg = aggregator(vec![
            Arc::new(Failing),
            Arc::new(Fixed {
                name: "sample",
                comps: vec![comp_at("a", None), comp_at("b", None)],
            }),
            Arc::new(Panicking),
            Arc::new(Slow),
        ]);

        let comps = agg.get_comps(&query(), None, None, None).await;
        assert_eq!(ids(&comps), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_source_tag_applied_only_when_missing() {
        let mut tagged = comp_at("b", None);
        tagged.source = Some("partner-feed".to_string());

        let agg = aggregator(vec![Arc::new(Fixed {
            name: "sample",
            comps: vec![comp_at("a", None), tagged],
        })]);

        let comps = agg.get_comps(&query(), None, None, None).await;
        assert_eq!(comps[0].source.as_deref(), Some("sample"));
        assert_eq!(comps[1].source.as_deref(), Some("partner-feed"));
    }

    #[tokio::test]
    async fn test_distance_unknown_without_subject_coordinates() {
        let agg = aggregator(vec![Arc::new(Fixed {
            name: "sample",
            comps: vec![comp_at("a", Some(BETIM))],
        })]);

        let comps = agg.get_comps(&query(), None, None, Some(1.0)).await;
        assert_eq!(comps.len(), 1);
        assert_eq!(comps[0].distance_km, None);
    }

    #[tokio::test]
    async fn test_radius_drops_only_known_far_comps() {
        let agg = aggregator(vec![Arc::new(Fixed {
            name: "sample",
            comps: vec![
                comp_at("here", Some(CONTAGEM)),
                comp_at("betim", Some(BETIM)),
                comp_at("vespasiano", Some(VESPASIANO)),
                comp_at("nowhere", None),
            ],
        })]);

        let (lat, lon) = CONTAGEM;
        let comps = agg.get_comps(&query(), Some(lat), Some(lon), Some(20.0)).await;

        assert_eq!(ids(&comps), vec!["here", "betim", "nowhere"]);
        assert_eq!(comps[0].distance_km, Some(0.0));
        assert!(comps[1].distance_km.unwrap() <= 20.0);
        assert_eq!(comps[2].distance_km, None);

        for radius in [0.0, 5.0, 16.0, 40.0] {
            let comps = agg.get_comps(&query(), Some(lat), Some(lon), Some(radius)).await;
            assert!(comps.iter().all(|c| c.distance_km.is_none_or(|d| d <= radius)));
            assert!(comps.iter().any(|c| c.id.as_deref() == Some("nowhere")));
        }
    }

    #[tokio::test]
    async fn test_no_radius_keeps_everything() {
        let agg = aggregator(vec![
            Arc::new(EmptyConnector::new("olx")),
            Arc::new(Fixed {
                name: "sample",
                comps: vec![comp_at("far", Some((0.0, 0.0)))],
            }),
        ]);

        let (lat, lon) = CONTAGEM;
        let comps = agg.get_comps(&query(), Some(lat), Some(lon), None).await;
        assert_eq!(ids(&comps), vec!["far"]);
        assert!(comps[0].distance_km.unwrap() > 1000.0);
    }

    #[tokio::test]
    async fn test_no_connectors() {
        let agg = aggregator(Vec::new());
        assert_eq!(agg.connector_count(), 0);
        assert!(agg.get_comps(&query(), None, None, Some(10.0)).await.is_empty());
    }

    /// Flags when the search future is dropped before it finishes.
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    struct Stuck {
        dropped: Arc<AtomicBool>,
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Connector for Stuck {
        fn name(&self) -> &str {
            "stuck"
        }

        async fn search(&self, _query: &Query) -> Result<Vec<Comp>> {
            let _flag = DropFlag(Arc::clone(&self.dropped));
            tokio::time::sleep(Duration::from_secs(30)).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_dropping_search_aborts_sources() {
        let dropped = Arc::new(AtomicBool::new(false));
        let finished = Arc::new(AtomicBool::new(false));
        let agg = Aggregator::new(
            vec![Arc::new(Stuck {
                dropped: Arc::clone(&dropped),
                finished: Arc::clone(&finished),
            })],
            Duration::from_secs(60),
        );

        let cut_short = tokio::time::timeout(
            Duration::from_millis(50),
            agg.get_comps(&query(), None, None, None),
        )
        .await;
        assert!(cut_short.is_err());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(dropped.load(Ordering::SeqCst));
        assert!(!finished.load(Ordering::SeqCst));
    }
}
