//! In-process stand-in for a map/reduce cluster
//!
//! Shards are mapped on the rayon pool, every emission is routed to one of
//! `partitions` buckets by the FNV hash of its key, and each bucket is reduced
//! on its own worker. Values reach `reduce` in shard order, then in the order
//! they were emitted; jobs whose result must not depend on that order have to
//! make sure of it themselves.

use fnv::{FnvHashMap, FnvHasher};
use rayon::prelude::*;

use std::hash::{Hash, Hasher};

use crate::error::Result;

pub trait Job: Sync {
    type Input: Send;
    type Key: Hash + Eq + Send;
    type Value: Send;
    type Output: Send;

    /// Turn one input record into any number of keyed values
    fn map(&self, input: Self::Input, emit: &mut Vec<(Self::Key, Self::Value)>);

    /// Combine every value emitted under `key`; `None` drops the key
    fn reduce(&self, key: Self::Key, values: Vec<Self::Value>) -> Result<Option<Self::Output>>;
}

/// Reduced output, still split by partition, plus some bookkeeping
pub struct Shuffled<O> {
    pub partitions: Vec<Vec<O>>,
    pub records_in: usize,
    pub emitted:    usize,
    pub keys:       usize,
}

impl<O> Shuffled<O> {
    pub fn records_out(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }
    /// Keys that `reduce` threw away
    pub fn dropped(&self) -> usize {
        self.keys - self.records_out()
    }
    pub fn into_records(self) -> impl Iterator<Item=O> {
        self.partitions.into_iter().flat_map(|p| p.into_iter())
    }
}

pub fn partition_of<K: Hash>(key: &K, partitions: usize) -> usize {
    let mut h = FnvHasher::default();
    key.hash(&mut h);
    (h.finish() % partitions as u64) as usize
}

pub fn execute<J: Job>(job: &J, shards: Vec<Vec<J::Input>>, partitions: usize)
    -> Result<Shuffled<J::Output>>
{
    assert!(partitions > 0, "a shuffle needs at least one partition");
    let records_in = shards.iter().map(Vec::len).sum();

    // map
    let mapped: Vec<Vec<(J::Key, J::Value)>> = shards
        .into_par_iter()
        .map(|shard| {
            let mut emitted = Vec::with_capacity(shard.len());
            for input in shard {
                job.map(input, &mut emitted);
            }
            emitted
        })
        .collect();
    let emitted = mapped.iter().map(Vec::len).sum();

    // shuffle; single threaded so each group sees a fixed value order
    let mut buckets: Vec<FnvHashMap<J::Key, Vec<J::Value>>> = (0..partitions)
        .map(|_| FnvHashMap::default())
        .collect();
    for shard in mapped {
        for (key, value) in shard {
            let p = partition_of(&key, partitions);
            buckets[p].entry(key).or_insert_with(Vec::new).push(value);
        }
    }
    let keys = buckets.iter().map(|b| b.len()).sum();

    // reduce
    let partitions = buckets
        .into_par_iter()
        .map(|bucket| -> Result<Vec<J::Output>> {
            let mut out = Vec::with_capacity(bucket.len());
            for (key, values) in bucket {
                if let Some(o) = job.reduce(key, values)? {
                    out.push(o);
                }
            }
            Ok(out)
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Shuffled { partitions, records_in, emitted, keys })
}
