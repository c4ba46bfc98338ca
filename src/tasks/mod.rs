// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub mod args;
pub mod artifacts;
pub mod report;
pub mod util;

pub use artifacts::ArtifactsCommand;
pub use report::ReportCommand;
