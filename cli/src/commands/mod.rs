// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the turnstile CLI

pub mod simulate;
pub mod validate;

pub use self::simulate::SimulateArgs;
pub use self::validate::ValidateArgs;
