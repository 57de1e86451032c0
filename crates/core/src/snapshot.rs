// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::idle::PollBudget;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TargetSnapshot {
    pub board: String,
    pub phase: String,
    pub budget: PollBudget,
    pub peripherals: BTreeMap<String, serde_json::Value>,
}
