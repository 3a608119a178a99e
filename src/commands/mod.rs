// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

pub mod config;
pub mod categories;
pub mod projects;
pub mod transactions;
pub mod importer;
pub mod exporter;
pub mod reports;
pub mod partners;
pub mod payments;
pub mod assets;
pub mod settlement;
pub mod invoices;
pub mod todo;
pub mod doctor;
