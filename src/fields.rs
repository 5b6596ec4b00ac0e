//! Enumerations and field types for tasks.
//!
//! This module defines the task status and the classification of where a
//! batch of follow-up tasks came from.

use clap::ValueEnum;
use serde::Serialize;

/// Task completion status. `Completed` is terminal.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Todo,
    Completed,
}

/// Why the canned follow-ups were used instead of generated ones.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackSet {
    /// Network failure, timeout or non-success status.
    Transport,
    /// The generator answered but yielded fewer than two usable lines.
    LowYield,
    /// Unreadable or malformed response, or anything else that went wrong.
    Unexpected,
}

/// Origin of the two follow-up tasks produced by one completion.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FollowUpSource {
    Generated,
    Fallback(FallbackSet),
}

/// Output format for headless commands.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}
