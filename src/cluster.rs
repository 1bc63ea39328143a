use palette::Srgb;

/// Bit of the cluster id that marks the brighter variant of a hue.
pub const PLUS_FLAG: u8 = 0b1000;

/// Mask selecting the 3-bit hue code out of a cluster id.
pub const CODE_MASK: u8 = 0b0111;

/// Names of the 16 cluster ids, indexed by id.
const ID_NAMES: [&str; 16] = [
    "black",
    "dark blue",
    "dark green",
    "dark cyan",
    "dark red",
    "dark magenta",
    "dark yellow",
    "light gray",
    "gray",
    "light blue",
    "light green",
    "light cyan",
    "light red",
    "light magenta",
    "light yellow",
    "white",
];

/// Names of the 8 hue codes, indexed by code.
const CODE_NAMES: [&str; 8] = [
    "black", "blue", "green", "cyan", "red", "magenta", "yellow", "white",
];

/// One entry of a quantized palette.
///
/// Produced by [`crate::quantize`] for every bucket that received at least
/// one sample. A result list never holds two clusters with the same `id`,
/// but a `code` may appear twice (once with and once without the plus flag).
#[derive(Clone, Debug, PartialEq)]
pub struct Cluster {
    /// 4-bit cluster id: plus flag in bit 3, hue code in bits 2..0.
    pub id: u8,
    /// 3-bit hue code, always `id & 0b111`.
    pub code: u8,
    /// Share of the sampled pixels that landed in this cluster, in `(0, 1]`.
    pub area: f64,
    /// Average red, green and blue of the cluster.
    pub bytes: [u8; 3],
}

impl Cluster {
    pub(crate) fn new(id: u8, area: f64, bytes: [u8; 3]) -> Self {
        debug_assert!(id < 16);
        Self {
            id,
            code: id & CODE_MASK,
            area,
            bytes,
        }
    }

    /// Whether the brighter ("plus") variant of the hue was selected.
    #[inline]
    pub fn is_plus(&self) -> bool {
        self.id & PLUS_FLAG != 0
    }

    /// The average color as an sRGB triple.
    pub fn color(&self) -> Srgb<u8> {
        let [r, g, b] = self.bytes;
        Srgb::new(r, g, b)
    }

    /// The average color formatted as `RRGGBB`.
    pub fn hex(&self) -> String {
        let c = self.color();
        format!("{:02X}{:02X}{:02X}", c.red, c.green, c.blue)
    }

    /// Human readable name of the cluster id, e.g. `"light cyan"`.
    pub fn name(&self) -> &'static str {
        ID_NAMES[(self.id & 0x0F) as usize]
    }

    /// Human readable name of the hue code, e.g. `"cyan"`.
    pub fn code_name(&self) -> &'static str {
        CODE_NAMES[(self.code & CODE_MASK) as usize]
    }
}
