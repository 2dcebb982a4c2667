//! Logging that goes through `defmt` on firmware and `log` elsewhere.

macro_rules! debug {
    ( $($arg:tt)+ ) => (
        #[cfg(feature = "defmt")]
        defmt::debug!($($arg)+);
        #[cfg(all(feature = "log", not(feature = "defmt")))]
        ::log::debug!($($arg)+);
    );
}

macro_rules! info {
    ( $($arg:tt)+ ) => (
        #[cfg(feature = "defmt")]
        defmt::info!($($arg)+);
        #[cfg(all(feature = "log", not(feature = "defmt")))]
        ::log::info!($($arg)+);
    );
}

// Named so it does not clash with the builtin `warn` lint attribute.
macro_rules! warning {
    ( $($arg:tt)+ ) => (
        #[cfg(feature = "defmt")]
        defmt::warn!($($arg)+);
        #[cfg(all(feature = "log", not(feature = "defmt")))]
        ::log::warn!($($arg)+);
    );
}

pub(crate) use debug;
pub(crate) use info;
pub(crate) use warning;
