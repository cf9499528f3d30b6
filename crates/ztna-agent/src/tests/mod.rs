//! Agent tests against an in-process backend double.

mod helpers;

mod enrollment;
mod reporting;
