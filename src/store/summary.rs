//! Health summaries computed from a sample snapshot.

use serde::Serialize;

use super::Sample;

/// Upper bounds of the latency histogram, in milliseconds. A final
/// unbounded bucket is always appended.
pub const DEFAULT_BUCKETS_MS: [u64; 4] = [60, 100, 200, 1000];

/// One histogram bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bucket {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_ms: Option<u64>,
    pub count: usize,
}

/// Aggregated view of a target's recent history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub avg_ms: f64,
    pub ok: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent: Option<Vec<Sample>>,
    pub buckets: Vec<Bucket>,
}

/// Summarize a snapshot.
///
/// Only successful samples contribute to the average and the histogram. Each
/// goes into the first bucket whose bound exceeds its latency. `recent` keeps
/// the newest `recent` samples; 0 leaves the field out.
pub fn summarize(samples: &[Sample], bounds: &[u64], recent: usize) -> Summary {
    let mut buckets: Vec<Bucket> = bounds
        .iter()
        .map(|&max| Bucket {
            max_ms: Some(max),
            count: 0,
        })
        .chain(std::iter::once(Bucket {
            max_ms: None,
            count: 0,
        }))
        .collect();

    let mut ok = 0;
    let mut total_ms = 0.0;
    for sample in samples.iter().filter(|s| s.outcome.is_ok()) {
        ok += 1;
        let ms = sample.millis();
        total_ms += ms;
        if let Some(bucket) = buckets
            .iter_mut()
            .find(|b| b.max_ms.map_or(true, |max| ms < max as f64))
        {
            bucket.count += 1;
        }
    }

    let avg_ms = if ok > 0 { total_ms / ok as f64 } else { 0.0 };

    let recent = (recent > 0).then(|| {
        let start = samples.len().saturating_sub(recent);
        samples[start..].to_vec()
    });

    Summary {
        count: samples.len(),
        avg_ms,
        ok,
        recent,
        buckets,
    }
}
