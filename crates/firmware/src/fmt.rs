//! Logging macros which forward to [`defmt`](https://defmt.ferrous-systems.com) in `debug` builds and compile
//! away otherwise.

#![allow(unused_macros)]

macro_rules! info {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::info!($s $(, $x)*);
            #[cfg(not(feature = "defmt"))]
            let _ = ($( & $x ),*);
        }
    };
}

macro_rules! warn {
    ($s:literal $(, $x:expr)* $(,)?) => {
        {
            #[cfg(feature = "defmt")]
            ::defmt::warn!($s $(, $x)*);
            #[cfg(not(feature = "defmt"))]
            let _ = ($( & $x ),*);
        }
    };
}

/// Unwraps a `Result` during startup, where failure leaves nothing sensible to do.
macro_rules! unwrap {
    ($e:expr) => {
        match $e {
            Ok(value) => value,
            #[cfg(feature = "defmt")]
            Err(error) => ::defmt::panic!("{} failed: {}", ::core::stringify!($e), error),
            #[cfg(not(feature = "defmt"))]
            Err(_) => ::core::panic!("{} failed", ::core::stringify!($e)),
        }
    };
}
