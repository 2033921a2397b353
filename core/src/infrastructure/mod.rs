// Copyright (c) 2026 memlink contributors
// SPDX-License-Identifier: AGPL-3.0

pub mod llm;
