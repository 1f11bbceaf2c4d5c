#![deny(missing_docs)]
//! Tools to build seismic waveform data sets.
//!
//! Continuous waveforms are downloaded from the NIED Hi-net service for every event in a CMT
//! catalog, converted from WIN32 to SAC, and their reference times moved from Japan Standard
//! Time to UTC. Waveforms from FDSN data centers are mass downloaded for a list of events.

//
// Public API
//
pub use crate::archive::{Archive, EventRecord, WaveformRecord};
pub use crate::catalog::{
    load_catalog, parse_catalog, select_entries, CatalogEntry, CmtSolution, PdeHeader,
};
pub use crate::cmd_line::CommonCmdLineArgs;
pub use crate::config::{default_config_path, Config, FdsnConfig, HinetConfig, SacConfig};
pub use crate::convert::{convert_event, ConvertSummary};
pub use crate::errors::SeisDataErr;
pub use crate::fdsn::{
    read_events, FdsnEvent, MassDownloader, Provider, RectangularDomain, Restrictions, Storage,
};
pub use crate::hinet::{EventWindow, HinetClient};
pub use crate::network::{Network, NetworkCode};
pub use crate::sac::{SacFile, SacHeader};
pub use crate::time_revise::{
    revise_event, HeaderWriter, NativeWriter, SacProcessWriter, TimeCorrection,
};
pub use crate::win32::ExtractOptions;

//
// Modules
//
pub mod calendar;
pub mod catalog;
pub mod config;
pub mod fdsn;
pub mod hinet;
pub mod layout;
pub mod network;
pub mod sac;
pub mod time_revise;
pub mod win32;

mod archive;
mod cmd_line;
mod convert;
mod errors;
