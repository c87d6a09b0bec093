/// The core TowerMap interface: a [`skip list`] ordered map
///
/// [`skip list`]: https://en.wikipedia.org/wiki/Skip_list
pub mod skiplist;

pub mod errs;

mod arena;

pub use crate::skiplist::{
    level_generator::{
        GeometricLevels,
        LevelGenerator,
    },
    map::{
        IntoIter,
        Iter,
        IterMut,
        Keys,
        SkipMap,
        Values,
        ValuesMut,
    },
};

/// [`DEFAULT_MAX_LEVEL`] is the tower ceiling used by [`SkipMap::default`].
/// With p = 1/2 this comfortably covers maps of ~65K entries.
pub const DEFAULT_MAX_LEVEL: usize = 16;

/// [`DEFAULT_P`] is the probability that a freshly drawn tower reaches each
/// successive level.
pub const DEFAULT_P: f64 = 0.5;
