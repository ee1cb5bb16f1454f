//! Context-to-cluster mapping.
//!
//! Many raw contexts usually share very similar statistics. A [`ContextMap`]
//! collapses them onto a few clusters so only one model per cluster needs to
//! be transmitted. It is a plain lookup array; the identity map gives every
//! context its own model.

use crate::bit_io::{BitReader, BitWriter};
use crate::error::{Error, Result};
use crate::histogram::Histogram;
use crate::hybrid_uint::ceil_log2;

/// Maximum number of clusters a context map can address.
pub const MAX_CLUSTERS: usize = 256;

/// Rough header cost, in bits, charged per used symbol of a cluster model.
const HEADER_BITS_PER_SYMBOL: f64 = 6.0;

/// Fixed header cost of a cluster model, in bits.
const HEADER_BITS_FIXED: f64 = 16.0;

/// Lookup from raw context id to cluster id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextMap {
    map: Vec<u8>,
    num_clusters: usize,
}

impl ContextMap {
    /// Creates a map from explicit cluster ids.
    ///
    /// The number of clusters is one past the largest id.
    pub fn new(map: Vec<u8>) -> Result<Self> {
        let num_clusters = map.iter().max().map_or(0, |&m| usize::from(m) + 1);
        Ok(Self { map, num_clusters })
    }

    /// Maps every context to itself.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] if `num_contexts` exceeds [`MAX_CLUSTERS`].
    pub fn identity(num_contexts: usize) -> Result<Self> {
        if num_contexts > MAX_CLUSTERS {
            return Err(Error::InvalidConfig(
                "identity context map limited to 256 contexts",
            ));
        }
        Ok(Self {
            map: (0..num_contexts).map(|c| c as u8).collect(),
            num_clusters: num_contexts,
        })
    }

    /// Cluster of raw context `context`.
    #[inline]
    pub fn cluster(&self, context: usize) -> Result<usize> {
        self.map
            .get(context)
            .map(|&c| usize::from(c))
            .ok_or(Error::ContextOutOfRange {
                context,
                num_contexts: self.map.len(),
            })
    }

    /// Number of raw contexts.
    pub fn num_contexts(&self) -> usize {
        self.map.len()
    }

    /// Number of clusters.
    pub fn num_clusters(&self) -> usize {
        self.num_clusters
    }

    /// The raw lookup array.
    pub fn as_slice(&self) -> &[u8] {
        &self.map
    }

    /// True if every context maps to itself.
    pub fn is_identity(&self) -> bool {
        self.map.iter().enumerate().all(|(i, &c)| usize::from(c) == i)
    }

    /// Serializes the map: 4 bits of entry width, then each entry.
    pub fn write(&self, writer: &mut BitWriter) {
        let entry_bits = ceil_log2(self.num_clusters as u32);
        writer.write_bits(u64::from(entry_bits), 4);
        for &c in &self.map {
            writer.write_bits(u64::from(c), entry_bits);
        }
    }

    /// Reads a map of `num_contexts` entries written by [`ContextMap::write`].
    pub fn read(reader: &mut BitReader<'_>, num_contexts: usize) -> Result<Self> {
        let entry_bits = reader.read_bits(4)?;
        if entry_bits > 8 {
            return Err(Error::InvalidStream("context map entry width above 8 bits"));
        }
        let map = (0..num_contexts)
            .map(|_| reader.read_bits(entry_bits).map(|c| c as u8))
            .collect::<Result<Vec<_>>>()?;
        Self::new(map)
    }
}

/// Estimated cost in bits of coding `histogram` with its own model.
fn estimate_cost(histogram: &Histogram) -> f64 {
    if histogram.is_empty() {
        return 0.0;
    }
    histogram.shannon_entropy_bits()
        + HEADER_BITS_FIXED
        + HEADER_BITS_PER_SYMBOL * histogram.num_used_symbols() as f64
}

/// Greedily merges per-context histograms into at most `max_clusters` clusters.
///
/// Each nonempty histogram joins the existing cluster whose estimated cost
/// grows the least, unless opening a new cluster is cheaper and the cluster
/// budget allows it. Empty histograms map to cluster 0.
///
/// Returns the context map and one merged histogram per cluster.
pub fn cluster_histograms(
    histograms: &[Histogram],
    max_clusters: usize,
) -> Result<(ContextMap, Vec<Histogram>)> {
    if max_clusters == 0 || max_clusters > MAX_CLUSTERS {
        return Err(Error::InvalidConfig("max_clusters must be in 1..=256"));
    }
    let mut map = vec![0u8; histograms.len()];
    let mut clusters: Vec<Histogram> = Vec::new();
    let mut costs: Vec<f64> = Vec::new();

    for (ctx, histogram) in histograms.iter().enumerate() {
        if histogram.is_empty() {
            continue;
        }
        let own_cost = estimate_cost(histogram);
        let mut best_slot = clusters.len();
        let mut best_delta = if clusters.len() >= max_clusters {
            f64::MAX
        } else {
            own_cost
        };
        for (slot, cluster) in clusters.iter().enumerate() {
            let delta = estimate_cost(&cluster.combined(histogram)) - costs[slot];
            if delta < best_delta {
                best_delta = delta;
                best_slot = slot;
            }
        }
        if best_slot == clusters.len() {
            clusters.push(histogram.clone());
            costs.push(own_cost);
        } else {
            clusters[best_slot].add_histogram(histogram);
            costs[best_slot] += best_delta;
        }
        map[ctx] = best_slot as u8;
    }

    if clusters.is_empty() {
        clusters.push(Histogram::new());
    }
    tracing::debug!(
        contexts = histograms.len(),
        clusters = clusters.len(),
        "clustered histograms"
    );
    let num_clusters = clusters.len();
    Ok((
        ContextMap { map, num_clusters },
        clusters,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_identity() {
        let map = ContextMap::identity(5).unwrap();
        assert!(map.is_identity());
        assert_eq!(map.num_clusters(), 5);
        assert_eq!(map.cluster(3).unwrap(), 3);
        assert!(matches!(
            map.cluster(5),
            Err(Error::ContextOutOfRange { context: 5, .. })
        ));
        assert!(ContextMap::identity(MAX_CLUSTERS + 1).is_err());
    }

    #[test]
    fn test_identical_histograms_share_a_cluster() {
        let h = Histogram::from_counts(&[100, 50, 25, 0, 1]);
        let other = Histogram::from_counts(&[0, 0, 0, 500, 0, 0, 0, 500]);
        let (map, clusters) = cluster_histograms(&[h.clone(), other, h], 8).unwrap();
        assert_eq!(map.cluster(0).unwrap(), map.cluster(2).unwrap());
        assert_ne!(map.cluster(0).unwrap(), map.cluster(1).unwrap());
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn test_all_empty_yields_one_cluster() {
        let (map, clusters) = cluster_histograms(&[Histogram::new(), Histogram::new()], 4).unwrap();
        assert_eq!(map.as_slice(), &[0, 0]);
        assert_eq!(clusters.len(), 1);
        assert_eq!(map.num_clusters(), 1);
    }

    #[test]
    fn test_rejects_zero_clusters() {
        assert!(cluster_histograms(&[], 0).is_err());
    }

    proptest! {
        #[test]
        fn prop_clustering_preserves_counts(
            raw in prop::collection::vec(prop::collection::vec(0u32..50, 0..12), 1..40),
            max_clusters in 1usize..6,
        ) {
            let histograms: Vec<Histogram> = raw.iter().map(|c| Histogram::from_counts(c)).collect();
            let (map, clusters) = cluster_histograms(&histograms, max_clusters).unwrap();
            prop_assert!(clusters.len() <= max_clusters);
            prop_assert_eq!(map.num_clusters(), clusters.len());
            let mut expected = vec![Histogram::new(); clusters.len()];
            for (ctx, h) in histograms.iter().enumerate() {
                expected[map.cluster(ctx).unwrap()].add_histogram(h);
            }
            prop_assert_eq!(expected, clusters);
        }

        #[test]
        fn prop_serialization_roundtrip(map in prop::collection::vec(0u8..=255, 0..300)) {
            let map = ContextMap::new(map).unwrap();
            let mut writer = BitWriter::new();
            map.write(&mut writer);
            let bytes = writer.into_bytes();
            let mut reader = BitReader::new(&bytes);
            prop_assert_eq!(ContextMap::read(&mut reader, map.num_contexts()).unwrap(), map);
        }
    }
}
