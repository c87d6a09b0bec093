//! An ordered map built on a [`skip list`].
//!
//! Every entry lives on level 0, which is a plain sorted linked list. Each
//! higher level holds a random subset of the level below it, so a search can
//! skip over long runs of entries before dropping down, giving expected
//! O(log n) lookup, insertion, and removal without any rebalancing.
//!
//! How far up a new entry's tower reaches is decided by a
//! [`LevelGenerator`](level_generator::LevelGenerator); the geometric default
//! should suffice for almost every use, but the generator is swappable, which
//! also makes the structure deterministic under test.
//!
//! [`skip list`]: https://en.wikipedia.org/wiki/Skip_list

pub mod level_generator;
pub mod map;

mod node;
