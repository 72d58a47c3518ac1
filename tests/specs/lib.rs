// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end behavior specs for the sync layer.

#[cfg(test)]
mod scenarios;
