// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Tessera Protocol — Transaction Construction Core
//!
//! Tessera builds transactions for a permissioned ledger. This crate holds
//! the part that turns intents into transaction pieces: an [`action::Action`]
//! contract, the issuance action that mints new units of an asset, and the
//! seams it talks to.
//!
//! ## Architecture
//!
//! - **action** — The `Action` trait, `IssueAction`, build contexts.
//! - **asset** — Asset definitions, the resolver seam, memory and sled stores.
//! - **transaction** — Inputs, outputs, reference data, signing instructions.
//! - **program** — Multisig issuance programs and the inspector seam.
//! - **signers** — Signer key sets and derivation paths.
//! - **crypto** — Hashing, extended keys, issuance nonces.
//! - **config** — Protocol constants and time-validity policy.
//!
//! ## Ground Rules
//!
//! 1. Actions never write. A failed build leaves nothing behind.
//! 2. Every collaborator is a trait object, so tests can starve, stall or
//!    break any one of them.
//! 3. Nonces come from the OS CSPRNG and are never retried.

pub mod action;
pub mod asset;
pub mod config;
pub mod crypto;
pub mod program;
pub mod signers;
pub mod transaction;
