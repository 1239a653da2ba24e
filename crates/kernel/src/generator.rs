//! Seeded noise generation of chunk terrain grids.

use crate::entity::ValidationError;
use chunkworld_common::{AbsPos, ChunkCoord, Sampling, WorldConfig};
use noise::{NoiseFn, OpenSimplex};

/// Terrain samples of one chunk, row-major, each in `[-1, 1]`.
///
/// Indexed by chunk-local Absolute coordinates: `x` is the row, `y` the column.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkData {
    size: u32,
    samples: Vec<f64>,
}

impl ChunkData {
    /// Wrap decoded samples, rejecting any grid that is not `size * size`.
    pub fn from_samples(size: u32, samples: Vec<f64>) -> Result<Self, ValidationError> {
        let expected = size as usize * size as usize;
        if size == 0 || samples.len() != expected {
            return Err(ValidationError::GridShape {
                expected,
                actual: samples.len(),
            });
        }
        Ok(Self { size, samples })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// Sample at a chunk-local position, `None` outside the chunk.
    pub fn get(&self, abs: AbsPos) -> Option<f64> {
        let size = self.size as i32;
        if !(0..size).contains(&abs.x) || !(0..size).contains(&abs.y) {
            return None;
        }
        self.samples.get((abs.x * size + abs.y) as usize).copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.samples.chunks(self.size as usize)
    }

    /// Bit-for-bit equality, the comparison used to validate persisted chunks.
    pub fn same_bits(&self, other: &ChunkData) -> bool {
        self.size == other.size
            && self
                .samples
                .iter()
                .zip(&other.samples)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

/// Deterministic terrain source: the same seed, sampling mode and chunk
/// coordinate always produce the same grid.
pub struct ChunkGenerator {
    noise: OpenSimplex,
    seed: u32,
    chunk_size: u32,
    sampling: Sampling,
}

impl ChunkGenerator {
    pub fn new(config: &WorldConfig) -> Self {
        Self {
            noise: OpenSimplex::new(config.seed),
            seed: config.seed,
            chunk_size: config.chunk_size,
            sampling: config.sampling,
        }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// Noise-space point sampled for local cell `abs` of chunk `coord`.
    pub fn sample_point(&self, coord: ChunkCoord, abs: AbsPos) -> [f64; 2] {
        let size = i64::from(self.chunk_size);
        let row_base = i64::from(coord.x) * size;
        let col_base = match self.sampling {
            Sampling::Corrected => i64::from(coord.y) * size,
            Sampling::Legacy => i64::from(coord.x) * size,
        };
        [
            (row_base + i64::from(abs.x)) as f64,
            (col_base + i64::from(abs.y)) as f64,
        ]
    }

    pub fn generate(&self, coord: ChunkCoord) -> ChunkData {
        let size = self.chunk_size as i32;
        let mut samples = Vec::with_capacity(size as usize * size as usize);
        for ax in 0..size {
            for ay in 0..size {
                let point = self.sample_point(coord, AbsPos::new(ax, ay));
                samples.push(self.noise.get(point).clamp(-1.0, 1.0));
            }
        }
        tracing::debug!(%coord, seed = self.seed, "generated chunk");
        ChunkData {
            size: self.chunk_size,
            samples,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(seed: u32, sampling: Sampling) -> WorldConfig {
        WorldConfig {
            chunk_size: 9,
            seed,
            sampling,
            ..WorldConfig::default()
        }
    }

    #[test]
    fn grid_has_chunk_dimensions() {
        let data = ChunkGenerator::new(&config(1, Sampling::Corrected)).generate(ChunkCoord::ORIGIN);
        assert_eq!(data.size(), 9);
        assert_eq!(data.samples().len(), 81);
        assert_eq!(data.rows().count(), 9);
        assert!(data.samples().iter().all(|v| (-1.0..=1.0).contains(v)));
    }

    #[test]
    fn generation_is_deterministic() {
        let a = ChunkGenerator::new(&config(42, Sampling::Corrected)).generate(ChunkCoord::new(3, -7));
        let b = ChunkGenerator::new(&config(42, Sampling::Corrected)).generate(ChunkCoord::new(3, -7));
        assert!(a.same_bits(&b));
    }

    #[test]
    fn different_chunks_differ() {
        let generator = ChunkGenerator::new(&config(42, Sampling::Corrected));
        let a = generator.generate(ChunkCoord::new(0, 0));
        let b = generator.generate(ChunkCoord::new(0, 1));
        assert!(!a.same_bits(&b));
    }

    #[test]
    fn legacy_sampling_repeats_along_y() {
        let generator = ChunkGenerator::new(&config(42, Sampling::Legacy));
        let a = generator.generate(ChunkCoord::new(2, 0));
        let b = generator.generate(ChunkCoord::new(2, 5));
        assert!(a.same_bits(&b));
        assert_eq!(
            generator.sample_point(ChunkCoord::new(2, 5), AbsPos::new(1, 3)),
            [19.0, 21.0]
        );
    }

    #[test]
    fn corrected_sampling_translates_both_axes() {
        let generator = ChunkGenerator::new(&config(42, Sampling::Corrected));
        assert_eq!(
            generator.sample_point(ChunkCoord::new(2, -1), AbsPos::new(1, 3)),
            [19.0, -6.0]
        );
    }

    #[test]
    fn get_is_row_major() {
        let data = ChunkData::from_samples(2, vec![0.1, 0.2, 0.3, 0.4]).unwrap();
        assert_eq!(data.get(AbsPos::new(1, 0)), Some(0.3));
        assert_eq!(data.get(AbsPos::new(0, 1)), Some(0.2));
        assert_eq!(data.get(AbsPos::new(2, 0)), None);
    }

    #[test]
    fn wrong_shape_rejected() {
        assert_eq!(
            ChunkData::from_samples(3, vec![0.0; 8]),
            Err(ValidationError::GridShape {
                expected: 9,
                actual: 8
            })
        );
    }
}
