//! Classification ensembles and the spectral building blocks they share
//!
//! - Sample type (one-shot vs loop)
//! - Category (Bass, Drums, FX, Melodic, Vocals)
//! - Tempo (BPM)
//! - Key
//!
//! Each ensemble runs its methods through [`crate::core::voting::run_method`]
//! and resolves the collected votes on a [`crate::core::voting::Ballot`].

pub mod category;
pub mod key;
pub mod mfcc;
pub mod sample_type;
pub mod spectral;
pub mod tempo;
#[cfg(feature = "tempo-toolkit")]
pub mod toolkit;

pub use category::FILENAME_WEIGHT;
pub use key::{key_profiles, match_key_profile, KeyProfile};
pub use mfcc::MfccParams;
