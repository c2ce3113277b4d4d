//! Reads a whole extract into an `EntityStore`.
//!
//! One reader (the calling thread) walks the container and hands data blobs to
//! a pool of decode workers over a bounded queue. Workers send decoded
//! fragments to a single aggregator, the only writer of the store. Once the
//! stream is exhausted the reader queues one `Stop` per worker; each worker
//! answers its `Stop` with exactly one `Done`, and the aggregator finishes after
//! counting one `Done` per worker.

use std::io::Read;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, info, span, trace, warn, Level};

use crate::block::{decode_block, Fragment};
use crate::config::{AttributeFilter, LoaderConfig};
use crate::container::{BlobKind, BlobReader};
use crate::decompress::decompress_blob;
use crate::entity::PointId;
use crate::error::{BlockError, LoadError, LoadErrorKind, LoadProgress};
use crate::header::{read_header, HeaderInfo};
use crate::index::IndexBuilder;
use crate::osm_pbf;
use crate::progress::ProgressReader;
use crate::store::EntityStore;

enum Work {
    Blob { seq: u64, blob: osm_pbf::Blob },
    Stop,
}

enum Decoded {
    Fragment { seq: u64, fragment: Fragment },
    Dropped { seq: u64 },
    Done,
}

/// Counters of one load.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    pub bytes_consumed: u64,
    /// Data blobs handed to the workers.
    pub data_blobs: u64,
    pub decoded_blobs: u64,
    /// Data blobs that failed to decode and contributed nothing.
    pub dropped_blobs: u64,
    pub workers: usize,
    /// `Done` messages the aggregator saw; equals `workers` on a clean shutdown.
    pub sentinels: usize,
}

/// A loaded extract.
#[derive(Debug)]
pub struct OsmMap {
    pub store: EntityStore,
    pub header: Option<HeaderInfo>,
    pub stats: LoadStats,
}

impl OsmMap {
    /// Hand every point to `builder` and return the root it reports.
    pub fn build_index<B: IndexBuilder + ?Sized>(&mut self, builder: &mut B) -> Option<PointId> {
        let _span = span!(Level::DEBUG, "build_index").entered();
        let root = builder.build(self.store.points_mut().collect());
        debug!(points = self.store.point_count(), "Built spatial index");
        root
    }
}

/// What the aggregator hands back once every worker has finished.
struct Aggregate {
    store: EntityStore,
    decoded_blobs: u64,
    dropped_blobs: u64,
    sentinels: usize,
}

/// What the reader got through before it stopped.
#[derive(Default)]
struct FeedSummary {
    header: Option<HeaderInfo>,
    bytes_consumed: u64,
    data_blobs: u64,
}

/// Read the extract in `reader` and decode it with `config.workers` threads.
///
/// Framing and header problems abort the read. A data blob that fails to
/// decompress or decode is logged and skipped.
pub fn read_map<R: Read>(reader: R, config: &LoaderConfig) -> Result<OsmMap, LoadError> {
    let workers = config.worker_count();
    let (work_tx, work_rx) = bounded::<Work>(config.work_queue_depth);
    let (result_tx, result_rx) = bounded::<Decoded>(config.result_queue_depth);
    let (done_tx, done_rx) = bounded::<Aggregate>(1);

    let (summary, failure, collected) = thread::scope(|scope| {
        for worker in 0..workers {
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            let filter = &config.filter;
            scope.spawn(move || decode_worker(worker, work_rx, result_tx, filter));
        }
        // Only the workers hold these now, so a dead pool shows up as a
        // disconnected channel instead of a hang.
        drop(work_rx);
        drop(result_tx);
        scope.spawn(move || aggregate(result_rx, workers, done_tx));

        let (summary, failure) = feed(reader, &work_tx, config.progress_interval);
        for _ in 0..workers {
            if work_tx.send(Work::Stop).is_err() {
                break;
            }
        }
        (summary, failure, done_rx.recv().ok())
    });

    let collected = collected.unwrap_or_else(|| Aggregate {
        store: EntityStore::new(),
        decoded_blobs: 0,
        dropped_blobs: 0,
        sentinels: 0,
    });

    if let Some(kind) = failure {
        let progress = LoadProgress {
            bytes_consumed: summary.bytes_consumed,
            points: collected.store.point_count(),
            ways: collected.store.way_count(),
            relations: collected.store.relation_count(),
        };
        warn!(%progress, error = %kind, "Map read aborted");
        return Err(LoadError::new(kind, progress));
    }

    let stats = LoadStats {
        bytes_consumed: summary.bytes_consumed,
        data_blobs: summary.data_blobs,
        decoded_blobs: collected.decoded_blobs,
        dropped_blobs: collected.dropped_blobs,
        workers,
        sentinels: collected.sentinels,
    };
    info!(
        bytes = stats.bytes_consumed,
        nodes = collected.store.point_count(),
        ways = collected.store.way_count(),
        relations = collected.store.relation_count(),
        dropped_blobs = stats.dropped_blobs,
        "Finished reading map"
    );
    Ok(OsmMap { store: collected.store, header: summary.header, stats })
}

/// Walk the container, validating the header inline and queueing data blobs.
fn feed<R: Read>(
    reader: R,
    work: &Sender<Work>,
    progress_interval: u64,
) -> (FeedSummary, Option<LoadErrorKind>) {
    let _span = span!(Level::DEBUG, "feed").entered();

    let progress = ProgressReader::new(reader, progress_interval, |bytes| {
        debug!(bytes, "Read progress");
    });
    let mut blobs = BlobReader::new(progress);
    let mut summary = FeedSummary::default();

    let failure = loop {
        let record = match blobs.read_next_record() {
            Ok(Some(record)) => record,
            Ok(None) => break None,
            Err(err) => break Some(LoadErrorKind::from(err)),
        };
        summary.bytes_consumed = blobs.bytes_consumed();

        match record.kind {
            BlobKind::Header => match read_header(record.blob) {
                Ok(header) => summary.header = Some(header),
                Err(err) => break Some(LoadErrorKind::from(err)),
            },
            BlobKind::Data => {
                if summary.header.is_none() && summary.data_blobs == 0 {
                    warn!("Data blob before any header blob");
                }
                let seq = summary.data_blobs;
                trace!(seq, "Queueing data blob");
                if work.send(Work::Blob { seq, blob: record.blob }).is_err() {
                    break Some(LoadErrorKind::PoolDisconnected);
                }
                summary.data_blobs += 1;
            }
        }
    };
    summary.bytes_consumed = blobs.bytes_consumed();
    (summary, failure)
}

fn process_blob(blob: osm_pbf::Blob, filter: &AttributeFilter) -> Result<Fragment, BlockError> {
    let data = decompress_blob(blob)?;
    decode_block(&data, filter)
}

fn decode_worker(
    worker: usize,
    work: Receiver<Work>,
    results: Sender<Decoded>,
    filter: &AttributeFilter,
) {
    let _span = span!(Level::DEBUG, "decode_worker", worker = worker).entered();

    loop {
        let (seq, blob) = match work.recv() {
            Ok(Work::Blob { seq, blob }) => (seq, blob),
            Ok(Work::Stop) | Err(_) => break,
        };
        let message = match process_blob(blob, filter) {
            Ok(fragment) => Decoded::Fragment { seq, fragment },
            Err(err) => {
                warn!(seq, error = %err, "Block decode failed, dropping blob");
                Decoded::Dropped { seq }
            }
        };
        if results.send(message).is_err() {
            return;
        }
    }
    let _ = results.send(Decoded::Done);
}

fn aggregate(results: Receiver<Decoded>, workers: usize, done: Sender<Aggregate>) {
    let _span = span!(Level::DEBUG, "aggregate").entered();

    let mut out = Aggregate {
        store: EntityStore::new(),
        decoded_blobs: 0,
        dropped_blobs: 0,
        sentinels: 0,
    };
    while out.sentinels < workers {
        match results.recv() {
            Ok(Decoded::Fragment { seq, fragment }) => {
                debug!(
                    seq,
                    points = fragment.points.len(),
                    ways = fragment.ways.len(),
                    relations = fragment.relations.len(),
                    "Merging fragment"
                );
                out.store.merge(fragment);
                out.decoded_blobs += 1;
            }
            Ok(Decoded::Dropped { seq }) => {
                trace!(seq, "Skipping dropped blob");
                out.dropped_blobs += 1;
            }
            Ok(Decoded::Done) => out.sentinels += 1,
            Err(_) => {
                warn!(sentinels = out.sentinels, workers, "Workers disconnected early");
                break;
            }
        }
    }
    let _ = done.send(out);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stream_yields_empty_map() {
        for workers in 1..=3 {
            let map = read_map(&[][..], &LoaderConfig::with_workers(workers)).unwrap();
            assert!(map.store.is_empty());
            assert!(map.header.is_none());
            assert_eq!(map.stats.sentinels, workers);
            assert_eq!(map.stats.data_blobs, 0);
        }
    }

    #[test]
    fn aggregator_counts_one_done_per_worker() {
        let (tx, rx) = bounded::<Decoded>(8);
        let (done_tx, done_rx) = bounded::<Aggregate>(1);
        tx.send(Decoded::Fragment { seq: 0, fragment: Fragment::default() }).unwrap();
        tx.send(Decoded::Done).unwrap();
        tx.send(Decoded::Dropped { seq: 1 }).unwrap();
        tx.send(Decoded::Done).unwrap();
        aggregate(rx, 2, done_tx);
        let out = done_rx.try_recv().unwrap();
        assert_eq!(out.sentinels, 2);
        assert_eq!(out.decoded_blobs, 1);
        assert_eq!(out.dropped_blobs, 1);
        assert!(done_rx.try_recv().is_err());
    }

    #[test]
    fn worker_answers_stop_with_one_done() {
        let (work_tx, work_rx) = bounded::<Work>(4);
        let (result_tx, result_rx) = bounded::<Decoded>(4);
        work_tx
            .send(Work::Blob {
                seq: 0,
                blob: osm_pbf::Blob { raw_size: None, data: None },
            })
            .unwrap();
        work_tx.send(Work::Stop).unwrap();
        decode_worker(0, work_rx, result_tx, &AttributeFilter::default());

        assert!(matches!(result_rx.try_recv(), Ok(Decoded::Dropped { seq: 0 })));
        assert!(matches!(result_rx.try_recv(), Ok(Decoded::Done)));
        assert!(result_rx.try_recv().is_err());
    }
}
