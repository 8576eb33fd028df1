//! Virtual file streams.
//!
//! Stages read trees of files with [`src`], push them through
//! [`FileTransform`]s with [`pipe`], and write them back with [`dest`].
//! File order is preserved end to end.

mod file;
mod fs;
mod transform;

pub use file::VirtualFile;
pub use fs::{dest, expand_braces, flatten, glob_base, pattern, src, src_paths};
pub use transform::{pipe, pipe_blocking, FileTransform, Plumbing};
