// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

mod common;
mod detection;
mod manual;
mod offline;
mod persistence;
