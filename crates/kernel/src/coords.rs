//! Coordinate spaces of the chunked world.
//!
//! - **Absolute**: chunk-local, `(0, 0)` is the chunk's top-left cell, each
//!   axis in `[0, chunk_size - 1]`.
//! - **Relative**: world-global, `(0, 0)` is the center of the origin chunk,
//!   unbounded up to the `i32` range.
//! - **Offset**: a step added to a Relative position before it is converted
//!   back to Absolute.
//! - **Screen**: character cells of the render surface. A grid row spans
//!   `cell_height` screen rows and a grid column spans `cell_width` screen
//!   columns.
//!
//! Intermediate sums are computed in `i64`. Results that do not fit `i32`
//! either fail with [`CoordError::Overflow`] or, for the unchecked Absolute
//! conversions, saturate to a value that always fails [`CoordinateSystem::check_abs`].

use chunkworld_common::{AbsPos, ChunkCoord, RelPos, ScreenPos, WorldConfig};
use std::fmt;

/// Which component of a coordinate failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => f.write_str("x"),
            Self::Y => f.write_str("y"),
        }
    }
}

/// Errors from coordinate validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoordError {
    #[error("{axis} = {value} is outside [0, {max}]")]
    OutOfRange { axis: Axis, value: i32, max: i32 },
    #[error("{axis} = {value} does not fit the i32 coordinate range")]
    Overflow { axis: Axis, value: i64 },
}

fn saturate(value: i64) -> i32 {
    value.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

fn narrow(axis: Axis, value: i64) -> Result<i32, CoordError> {
    i32::try_from(value).map_err(|_| CoordError::Overflow { axis, value })
}

/// Pure conversions between the four coordinate spaces, parameterized by the
/// chunk geometry of a [`WorldConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinateSystem {
    chunk_size: i64,
    cell_width: i64,
    cell_height: i64,
    half: i64,
}

impl CoordinateSystem {
    /// Geometry of a validated config.
    pub fn new(config: &WorldConfig) -> Self {
        Self::with_geometry(config.size(), config.cell_width as i32, config.cell_height as i32)
    }

    /// Non-positive sizes are raised to 1; [`WorldConfig::validate`] rejects
    /// them before a config reaches here.
    pub(crate) fn with_geometry(chunk_size: i32, cell_width: i32, cell_height: i32) -> Self {
        let chunk_size = i64::from(chunk_size.max(1));
        Self {
            chunk_size,
            cell_width: i64::from(cell_width.max(1)),
            cell_height: i64::from(cell_height.max(1)),
            half: chunk_size / 2,
        }
    }

    pub fn chunk_size(&self) -> i32 {
        self.chunk_size as i32
    }

    pub fn cell_width(&self) -> i32 {
        self.cell_width as i32
    }

    pub fn cell_height(&self) -> i32 {
        self.cell_height as i32
    }

    /// Ensure both axes of `abs` lie inside one chunk.
    pub fn check_abs(&self, abs: AbsPos) -> Result<AbsPos, CoordError> {
        let max = self.chunk_size() - 1;
        for (axis, value) in [(Axis::X, abs.x), (Axis::Y, abs.y)] {
            if !(0..=max).contains(&value) {
                return Err(CoordError::OutOfRange { axis, value, max });
            }
        }
        Ok(abs)
    }

    pub fn abs2rel(&self, abs: AbsPos) -> Result<RelPos, CoordError> {
        let abs = self.check_abs(abs)?;
        let half = self.half as i32;
        Ok(RelPos::new(abs.x - half, abs.y - half))
    }

    /// Relative space is unbounded, so this never fails; the result may lie
    /// outside the chunk and callers check it where that matters.
    pub fn rel2abs(&self, rel: RelPos) -> AbsPos {
        AbsPos::new(
            saturate(i64::from(rel.x) + self.half),
            saturate(i64::from(rel.y) + self.half),
        )
    }

    pub fn abs2screen(&self, abs: AbsPos) -> Result<ScreenPos, CoordError> {
        let abs = self.check_abs(abs)?;
        Ok(ScreenPos::new(
            narrow(Axis::X, i64::from(abs.x) * self.cell_height)?,
            narrow(Axis::Y, i64::from(abs.y) * self.cell_width)?,
        ))
    }

    pub fn screen2abs(&self, screen: ScreenPos) -> Result<AbsPos, CoordError> {
        let max_row = self.chunk_size * self.cell_height - 1;
        let max_col = self.chunk_size * self.cell_width - 1;
        if !(0..=max_row).contains(&i64::from(screen.x)) {
            return Err(CoordError::OutOfRange {
                axis: Axis::X,
                value: screen.x,
                max: saturate(max_row),
            });
        }
        if !(0..=max_col).contains(&i64::from(screen.y)) {
            return Err(CoordError::OutOfRange {
                axis: Axis::Y,
                value: screen.y,
                max: saturate(max_col),
            });
        }
        Ok(AbsPos::new(
            (i64::from(screen.x) / self.cell_height) as i32,
            (i64::from(screen.y) / self.cell_width) as i32,
        ))
    }

    pub fn rel2screen(&self, rel: RelPos) -> Result<ScreenPos, CoordError> {
        self.abs2screen(self.rel2abs(rel))
    }

    /// Absolute position reached by stepping `(dx, dy)` from `rel`.
    pub fn offset(&self, rel: RelPos, dx: i32, dy: i32) -> AbsPos {
        self.offset_in(ChunkCoord::ORIGIN, rel, dx, dy)
    }

    /// Absolute position, measured from `chunk`, reached by stepping
    /// `(dx, dy)` from `rel`. Unchecked, like [`abs_in`](Self::abs_in).
    pub fn offset_in(&self, chunk: ChunkCoord, rel: RelPos, dx: i32, dy: i32) -> AbsPos {
        AbsPos::new(
            saturate(self.from_origin(rel.x, chunk.x) + i64::from(dx)),
            saturate(self.from_origin(rel.y, chunk.y) + i64::from(dy)),
        )
    }

    /// Split a world-global Relative position into its owning chunk and the
    /// Absolute position inside that chunk.
    pub fn locate(&self, rel: RelPos) -> (ChunkCoord, AbsPos) {
        let sx = i64::from(rel.x) + self.half;
        let sy = i64::from(rel.y) + self.half;
        // |s / chunk_size| <= |rel| whenever half > 0, and s == rel otherwise
        (
            ChunkCoord::new(
                sx.div_euclid(self.chunk_size) as i32,
                sy.div_euclid(self.chunk_size) as i32,
            ),
            AbsPos::new(
                sx.rem_euclid(self.chunk_size) as i32,
                sy.rem_euclid(self.chunk_size) as i32,
            ),
        )
    }

    /// Inverse of [`locate`](Self::locate). Fails with `Overflow` when the
    /// world position lies past the `i32` range.
    pub fn to_relative(&self, chunk: ChunkCoord, abs: AbsPos) -> Result<RelPos, CoordError> {
        let abs = self.check_abs(abs)?;
        let x = i64::from(chunk.x) * self.chunk_size + i64::from(abs.x) - self.half;
        let y = i64::from(chunk.y) * self.chunk_size + i64::from(abs.y) - self.half;
        Ok(RelPos::new(narrow(Axis::X, x)?, narrow(Axis::Y, y)?))
    }

    /// Absolute position of `rel` measured from `chunk`'s top-left cell,
    /// unchecked. Equals `rel2abs` for the origin chunk.
    pub fn abs_in(&self, chunk: ChunkCoord, rel: RelPos) -> AbsPos {
        self.offset_in(chunk, rel, 0, 0)
    }

    fn from_origin(&self, rel: i32, chunk: i32) -> i64 {
        i64::from(rel) + self.half - i64::from(chunk) * self.chunk_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn coords() -> CoordinateSystem {
        CoordinateSystem::with_geometry(21, 2, 1)
    }

    #[test]
    fn center_of_chunk_is_relative_origin() {
        let cs = coords();
        assert_eq!(cs.abs2rel(AbsPos::new(10, 10)).unwrap(), RelPos::new(0, 0));
        assert_eq!(cs.rel2abs(RelPos::new(0, 0)), AbsPos::new(10, 10));
    }

    #[test]
    fn half_chunk_uses_floor_division() {
        let cs = CoordinateSystem::with_geometry(4, 1, 1);
        assert_eq!(cs.rel2abs(RelPos::new(0, 0)), AbsPos::new(2, 2));
        assert_eq!(cs.abs2rel(AbsPos::new(0, 3)).unwrap(), RelPos::new(-2, 1));
    }

    #[test]
    fn abs2rel_rejects_out_of_range() {
        let cs = coords();
        assert_eq!(
            cs.abs2rel(AbsPos::new(21, 0)),
            Err(CoordError::OutOfRange {
                axis: Axis::X,
                value: 21,
                max: 20
            })
        );
        assert_eq!(
            cs.abs2rel(AbsPos::new(0, -1)),
            Err(CoordError::OutOfRange {
                axis: Axis::Y,
                value: -1,
                max: 20
            })
        );
    }

    #[test]
    fn rel2abs_is_unbounded() {
        let cs = coords();
        assert_eq!(cs.rel2abs(RelPos::new(-100, 500)), AbsPos::new(-90, 510));
    }

    #[test]
    fn screen_scaling_is_axis_swapped() {
        let cs = coords();
        // rows scale by cell_height, columns by cell_width
        assert_eq!(cs.abs2screen(AbsPos::new(3, 4)).unwrap(), ScreenPos::new(3, 8));
        assert_eq!(cs.rel2screen(RelPos::new(0, 1)).unwrap(), ScreenPos::new(10, 22));
    }

    #[test]
    fn screen2abs_truncates() {
        let cs = coords();
        assert_eq!(cs.screen2abs(ScreenPos::new(3, 9)).unwrap(), AbsPos::new(3, 4));
        assert!(cs.screen2abs(ScreenPos::new(0, 42)).is_err());
        assert!(cs.screen2abs(ScreenPos::new(-1, 0)).is_err());
    }

    #[test]
    fn offset_steps_then_converts() {
        let cs = coords();
        assert_eq!(cs.offset(RelPos::new(0, 0), 0, 1), AbsPos::new(10, 11));
        assert_eq!(cs.offset(RelPos::new(-10, 0), -1, 0), AbsPos::new(-1, 10));
    }

    #[test]
    fn locate_splits_world_positions() {
        let cs = coords();
        assert_eq!(
            cs.locate(RelPos::new(0, 0)),
            (ChunkCoord::ORIGIN, AbsPos::new(10, 10))
        );
        assert_eq!(
            cs.locate(RelPos::new(11, -11)),
            (ChunkCoord::new(1, -1), AbsPos::new(0, 20))
        );
        assert_eq!(
            cs.to_relative(ChunkCoord::new(1, -1), AbsPos::new(0, 20)).unwrap(),
            RelPos::new(11, -11)
        );
    }

    #[test]
    fn abs_in_measures_from_chunk_origin() {
        let cs = coords();
        assert_eq!(cs.abs_in(ChunkCoord::ORIGIN, RelPos::new(2, 3)), AbsPos::new(12, 13));
        assert_eq!(cs.abs_in(ChunkCoord::new(1, 0), RelPos::new(11, 0)), AbsPos::new(0, 10));
        assert_eq!(cs.abs_in(ChunkCoord::new(1, 0), RelPos::new(10, 0)), AbsPos::new(-1, 10));
    }

    #[test]
    fn extreme_relative_positions_do_not_overflow() {
        let cs = coords();
        let (chunk, abs) = cs.locate(RelPos::new(i32::MAX, i32::MIN));
        assert_eq!(chunk, ChunkCoord::new(102_261_126, -102_261_126));
        assert_eq!(abs, AbsPos::new(11, 8));
        assert_eq!(cs.to_relative(chunk, abs).unwrap(), RelPos::new(i32::MAX, i32::MIN));
        assert_eq!(cs.abs_in(chunk, RelPos::new(i32::MAX, i32::MIN)), abs);

        assert_eq!(
            cs.to_relative(chunk, AbsPos::new(12, 8)),
            Err(CoordError::Overflow {
                axis: Axis::X,
                value: i64::from(i32::MAX) + 1
            })
        );
        assert!(matches!(
            cs.to_relative(chunk, AbsPos::new(11, 7)),
            Err(CoordError::Overflow { axis: Axis::Y, .. })
        ));
    }

    #[test]
    fn unchecked_conversions_saturate() {
        let cs = coords();
        assert_eq!(cs.rel2abs(RelPos::new(i32::MAX, 0)), AbsPos::new(i32::MAX, 10));
        assert!(cs.rel2screen(RelPos::new(i32::MAX, 0)).is_err());
        assert_eq!(
            cs.offset(RelPos::new(i32::MAX, 0), 1, 0),
            AbsPos::new(i32::MAX, 10)
        );
        let far = cs.abs_in(ChunkCoord::new(i32::MIN, i32::MAX), RelPos::new(0, 0));
        assert!(cs.check_abs(far).is_err());
    }

    #[test]
    fn non_positive_geometry_is_raised_to_one() {
        let cs = CoordinateSystem::with_geometry(0, -2, 0);
        assert_eq!((cs.chunk_size(), cs.cell_width(), cs.cell_height()), (1, 1, 1));
        assert_eq!(cs.locate(RelPos::new(5, -5)), (ChunkCoord::new(5, -5), AbsPos::new(0, 0)));
    }

    fn geometry_and_abs() -> impl Strategy<Value = (i32, i32, i32)> {
        (1..200i32).prop_flat_map(|size| (Just(size), 0..size, 0..size))
    }

    proptest! {
        #[test]
        fn abs_rel_round_trip((size, ax, ay) in geometry_and_abs()) {
            let cs = CoordinateSystem::with_geometry(size, 1, 1);
            let abs = AbsPos::new(ax, ay);
            prop_assert_eq!(cs.rel2abs(cs.abs2rel(abs).unwrap()), abs);
        }

        #[test]
        fn locate_round_trip(size in 1..64i32, rx in -5000..5000i32, ry in -5000..5000i32) {
            let cs = CoordinateSystem::with_geometry(size, 1, 1);
            let rel = RelPos::new(rx, ry);
            let (chunk, abs) = cs.locate(rel);
            prop_assert!(cs.check_abs(abs).is_ok());
            prop_assert_eq!(cs.to_relative(chunk, abs).unwrap(), rel);
            prop_assert_eq!(cs.abs_in(chunk, rel), abs);
        }
    }
}
