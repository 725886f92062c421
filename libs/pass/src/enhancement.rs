//! The fixed set of image enhancements produced for every pass.

use crate::define_tokens;

define_tokens!(Enhancement {
    ContrastAMap => "contrasta-map",
    ContrastA => "contrasta",
    ContrastBMap => "contrastb-map",
    ContrastB => "contrastb",
    HvcMap => "hvc-map",
    HvcPrecipMap => "hvc-precip-map",
    HvcPrecip => "hvc-precip",
    Hvc => "hvc",
    HvctMap => "hvct-map",
    HvctPrecipMap => "hvct-precip-map",
    HvctPrecip => "hvct-precip",
    Hvct => "hvct",
    McirMap => "mcir-map",
    McirPrecipMap => "mcir-precip-map",
    McirPrecip => "mcir-precip",
    Mcir => "mcir",
    MsaMap => "msa-map",
    MsaPrecipMap => "msa-precip-map",
    MsaPrecip => "msa-precip",
    Msa => "msa",
    Pris => "pris",
    ThermMap => "therm-map",
    Therm => "therm",
});

impl Enhancement {
    /// Space-joined list of every enhancement token, as advertised by the
    /// pass listing endpoint.
    pub fn joined() -> String {
        Self::ALL
            .iter()
            .map(Enhancement::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}
