use std::collections::HashSet;
use std::thread;

/// Which attribute keys survive decoding, per entity kind. `None` keeps every key.
#[derive(Debug, Default, Clone)]
pub struct AttributeFilter {
    pub point_keys: Option<HashSet<String>>,
    pub way_keys: Option<HashSet<String>>,
    pub relation_keys: Option<HashSet<String>>,
}

impl AttributeFilter {
    pub fn keep_point(&self, key: &str) -> bool {
        keeps(&self.point_keys, key)
    }

    pub fn keep_way(&self, key: &str) -> bool {
        keeps(&self.way_keys, key)
    }

    pub fn keep_relation(&self, key: &str) -> bool {
        keeps(&self.relation_keys, key)
    }
}

fn keeps(allowed: &Option<HashSet<String>>, key: &str) -> bool {
    allowed.as_ref().map_or(true, |keys| keys.contains(key))
}

/// Knobs for one `read_map` call.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Decode workers. Zero is treated as one.
    pub workers: usize,
    /// Capacity of the blob queue feeding the workers; zero is a rendezvous.
    pub work_queue_depth: usize,
    /// Capacity of the fragment queue feeding the aggregator.
    pub result_queue_depth: usize,
    /// Bytes between progress log lines; zero picks the default.
    pub progress_interval: u64,
    pub filter: AttributeFilter,
}

impl LoaderConfig {
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            result_queue_depth: workers.max(1),
            ..Self::default()
        }
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.workers.max(1)
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        let workers = default_workers();
        Self {
            workers,
            work_queue_depth: 0,
            result_queue_depth: workers,
            progress_interval: crate::progress::DEFAULT_INTERVAL,
            filter: AttributeFilter::default(),
        }
    }
}

/// One worker per core, minus one core left for the reader and aggregator.
pub fn default_workers() -> usize {
    let cores = thread::available_parallelism().map_or(1, |n| n.get());
    cores.saturating_sub(1).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_keeps_everything() {
        let filter = AttributeFilter::default();
        assert!(filter.keep_point("name"));
        assert!(filter.keep_way("highway"));
        assert!(filter.keep_relation("type"));
    }

    #[test]
    fn allow_list_is_per_kind() {
        let filter = AttributeFilter {
            way_keys: Some(["highway".to_string()].into_iter().collect()),
            ..AttributeFilter::default()
        };
        assert!(filter.keep_way("highway"));
        assert!(!filter.keep_way("name"));
        assert!(filter.keep_point("name"));
    }

    #[test]
    fn worker_count_never_zero() {
        assert!(default_workers() >= 1);
        assert_eq!(LoaderConfig::with_workers(0).worker_count(), 1);
        assert_eq!(LoaderConfig::with_workers(3).worker_count(), 3);
    }
}
