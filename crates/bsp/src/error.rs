// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

#[derive(Debug, thiserror::Error)]
pub enum BringupError<E> {
    #[error("bring-up already ran on this board")]
    AlreadyInitialized,
    #[error("section {section} could not be initialized")]
    Memory {
        section: &'static str,
        #[source]
        source: E,
    },
}
