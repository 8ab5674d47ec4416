//! End-to-end scenarios for the conductor orchestrator.

mod scenarios;
