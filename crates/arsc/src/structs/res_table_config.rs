use std::fmt::Write;

use bitflags::bitflags;
use winnow::binary::{le_u8, le_u16, le_u32};
use winnow::prelude::*;
use winnow::token::take;

use crate::errors::ArscError;

bitflags! {
    /// Bitmask of configuration dimension groups, as produced by
    /// [`ResTableConfig::diff`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ConfigFlags: u32 {
        const CONFIG_MCC = 0x0001;
        const CONFIG_MNC = 0x0002;
        const CONFIG_LOCALE = 0x0004;
        const CONFIG_TOUCHSCREEN = 0x0008;
        const CONFIG_KEYBOARD = 0x0010;
        const CONFIG_KEYBOARD_HIDDEN = 0x0020;
        const CONFIG_NAVIGATION = 0x0040;
        const CONFIG_ORIENTATION = 0x0080;
        const CONFIG_DENSITY = 0x0100;
        const CONFIG_SCREEN_SIZE = 0x0200;
        const CONFIG_VERSION = 0x0400;
        const CONFIG_SCREEN_LAYOUT = 0x0800;
        const CONFIG_UI_MODE = 0x1000;
        const CONFIG_SMALLEST_SCREEN_SIZE = 0x2000;
    }
}

pub const ORIENTATION_ANY: u8 = 0x00;
pub const ORIENTATION_PORT: u8 = 0x01;
pub const ORIENTATION_LAND: u8 = 0x02;
pub const ORIENTATION_SQUARE: u8 = 0x03;

pub const TOUCHSCREEN_ANY: u8 = 0x00;
pub const TOUCHSCREEN_NOTOUCH: u8 = 0x01;
pub const TOUCHSCREEN_STYLUS: u8 = 0x02;
pub const TOUCHSCREEN_FINGER: u8 = 0x03;

pub const DENSITY_DEFAULT: u16 = 0;
pub const DENSITY_LOW: u16 = 120;
pub const DENSITY_MEDIUM: u16 = 160;
pub const DENSITY_HIGH: u16 = 240;
pub const DENSITY_NONE: u16 = 0xFFFF;

pub const KEYBOARD_ANY: u8 = 0x00;
pub const KEYBOARD_NOKEYS: u8 = 0x01;
pub const KEYBOARD_QWERTY: u8 = 0x02;
pub const KEYBOARD_12KEY: u8 = 0x03;

pub const NAVIGATION_ANY: u8 = 0x00;
pub const NAVIGATION_NONAV: u8 = 0x01;
pub const NAVIGATION_DPAD: u8 = 0x02;
pub const NAVIGATION_TRACKBALL: u8 = 0x03;
pub const NAVIGATION_WHEEL: u8 = 0x04;

pub const MASK_KEYSHIDDEN: u8 = 0x03;
pub const KEYSHIDDEN_ANY: u8 = 0x00;
pub const KEYSHIDDEN_NO: u8 = 0x01;
pub const KEYSHIDDEN_YES: u8 = 0x02;
pub const KEYSHIDDEN_SOFT: u8 = 0x03;

pub const MASK_NAVHIDDEN: u8 = 0x0C;
pub const NAVHIDDEN_ANY: u8 = 0x00;
pub const NAVHIDDEN_NO: u8 = 0x04;
pub const NAVHIDDEN_YES: u8 = 0x08;

pub const MASK_SCREENSIZE: u8 = 0x0F;
pub const SCREENSIZE_ANY: u8 = 0x00;
pub const SCREENSIZE_SMALL: u8 = 0x01;
pub const SCREENSIZE_NORMAL: u8 = 0x02;
pub const SCREENSIZE_LARGE: u8 = 0x03;
pub const SCREENSIZE_XLARGE: u8 = 0x04;

pub const MASK_SCREENLONG: u8 = 0x30;
pub const SCREENLONG_ANY: u8 = 0x00;
pub const SCREENLONG_NO: u8 = 0x10;
pub const SCREENLONG_YES: u8 = 0x20;

pub const MASK_UI_MODE_TYPE: u8 = 0x0F;
pub const UI_MODE_TYPE_ANY: u8 = 0x00;
pub const UI_MODE_TYPE_NORMAL: u8 = 0x01;
pub const UI_MODE_TYPE_DESK: u8 = 0x02;
pub const UI_MODE_TYPE_CAR: u8 = 0x03;
pub const UI_MODE_TYPE_TELEVISION: u8 = 0x04;

pub const MASK_UI_MODE_NIGHT: u8 = 0x30;
pub const UI_MODE_NIGHT_ANY: u8 = 0x00;
pub const UI_MODE_NIGHT_NO: u8 = 0x10;
pub const UI_MODE_NIGHT_YES: u8 = 0x20;

/// A device/runtime configuration vector, decoded from the wire's
/// self-describing `ResTable_config` record.
///
/// The all-zero value (`ResTableConfig::default()`) is the unconstrained
/// "any" configuration: it matches every request and every candidate
/// matches it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResTableConfig {
    /// Mobile country code (from SIM). 0 means "any".
    pub mcc: u16,
    /// Mobile network code (from SIM). 0 means "any".
    pub mnc: u16,

    /// ISO-639-1 language code as two raw bytes; `[0, 0]` means "any".
    pub language: [u8; 2],
    /// ISO-3166-1 region code as two raw bytes; `[0, 0]` means "any".
    pub country: [u8; 2],

    pub orientation: u8,
    pub touchscreen: u8,
    pub density: u16,

    pub keyboard: u8,
    pub navigation: u8,
    /// keysHidden and navHidden sub-fields, see the `MASK_*` constants
    pub input_flags: u8,

    /// Legacy pixel dimensions; 0 means "any"
    pub screen_width: u16,
    pub screen_height: u16,

    pub sdk_version: u16,
    pub minor_version: u16,

    /// Size bucket and long-aspect bits, see `MASK_SCREENSIZE`/`MASK_SCREENLONG`
    pub screen_layout: u8,
    /// Type and night bits, see `MASK_UI_MODE_TYPE`/`MASK_UI_MODE_NIGHT`
    pub ui_mode: u8,
    pub smallest_screen_width_dp: u16,

    pub screen_width_dp: u16,
    pub screen_height_dp: u16,
}

impl ResTableConfig {
    /// The unconstrained configuration
    pub const ANY: ResTableConfig = ResTableConfig {
        mcc: 0,
        mnc: 0,
        language: [0; 2],
        country: [0; 2],
        orientation: 0,
        touchscreen: 0,
        density: 0,
        keyboard: 0,
        navigation: 0,
        input_flags: 0,
        screen_width: 0,
        screen_height: 0,
        sdk_version: 0,
        minor_version: 0,
        screen_layout: 0,
        ui_mode: 0,
        smallest_screen_width_dp: 0,
        screen_width_dp: 0,
        screen_height_dp: 0,
    };

    /// Decode one size-prefixed config record.
    ///
    /// The wire struct is forward/backward compatible: only
    /// `min(declared size, known size)` bytes are interpreted, the rest of
    /// the known struct stays zero-filled, and any trailing unknown bytes
    /// are consumed so the cursor lands on the next field.
    pub fn decode(input: &mut &[u8]) -> Result<ResTableConfig, ArscError> {
        Self::decode_inner(input)
            .map_err(|_| ArscError::MalformedTable("config record extends past chunk"))
    }

    fn decode_inner(input: &mut &[u8]) -> ModalResult<ResTableConfig> {
        let start = input.len();
        let size = le_u32.parse_next(input)?;

        let mut config = ResTableConfig::default();

        if size >= 8 {
            let (mcc, mnc) = (le_u16, le_u16).parse_next(input)?;
            config.mcc = mcc;
            config.mnc = mnc;
        }
        if size >= 12 {
            let locale = take(4usize).parse_next(input)?;
            config.language = [locale[0], locale[1]];
            config.country = [locale[2], locale[3]];
        }
        if size >= 16 {
            let (orientation, touchscreen, density) = (le_u8, le_u8, le_u16).parse_next(input)?;
            config.orientation = orientation;
            config.touchscreen = touchscreen;
            config.density = density;
        }
        if size >= 20 {
            let (keyboard, navigation, input_flags, _pad) =
                (le_u8, le_u8, le_u8, le_u8).parse_next(input)?;
            config.keyboard = keyboard;
            config.navigation = navigation;
            config.input_flags = input_flags;
        }
        if size >= 24 {
            let (width, height) = (le_u16, le_u16).parse_next(input)?;
            config.screen_width = width;
            config.screen_height = height;
        }
        if size >= 28 {
            let (sdk, minor) = (le_u16, le_u16).parse_next(input)?;
            config.sdk_version = sdk;
            config.minor_version = minor;
        }
        if size >= 32 {
            let (layout, ui_mode, smallest) = (le_u8, le_u8, le_u16).parse_next(input)?;
            config.screen_layout = layout;
            config.ui_mode = ui_mode;
            config.smallest_screen_width_dp = smallest;
        }
        if size >= 36 {
            let (width_dp, height_dp) = (le_u16, le_u16).parse_next(input)?;
            config.screen_width_dp = width_dp;
            config.screen_height_dp = height_dp;
        }

        // newer writers may append fields we do not know about
        let consumed = (start - input.len()) as u32;
        let _ = take(size.saturating_sub(consumed) as usize).parse_next(input)?;

        Ok(config)
    }

    /// Encode this config as the current full-size wire record
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(36);
        out.extend_from_slice(&36u32.to_le_bytes());
        out.extend_from_slice(&self.mcc.to_le_bytes());
        out.extend_from_slice(&self.mnc.to_le_bytes());
        out.extend_from_slice(&self.language);
        out.extend_from_slice(&self.country);
        out.push(self.orientation);
        out.push(self.touchscreen);
        out.extend_from_slice(&self.density.to_le_bytes());
        out.push(self.keyboard);
        out.push(self.navigation);
        out.push(self.input_flags);
        out.push(0);
        out.extend_from_slice(&self.screen_width.to_le_bytes());
        out.extend_from_slice(&self.screen_height.to_le_bytes());
        out.extend_from_slice(&self.sdk_version.to_le_bytes());
        out.extend_from_slice(&self.minor_version.to_le_bytes());
        out.push(self.screen_layout);
        out.push(self.ui_mode);
        out.extend_from_slice(&self.smallest_screen_width_dp.to_le_bytes());
        out.extend_from_slice(&self.screen_width_dp.to_le_bytes());
        out.extend_from_slice(&self.screen_height_dp.to_le_bytes());
        out
    }

    #[inline]
    fn imsi(&self) -> u32 {
        (self.mcc as u32) | ((self.mnc as u32) << 16)
    }

    #[inline]
    fn locale(&self) -> u32 {
        u32::from_be_bytes([
            self.language[0],
            self.language[1],
            self.country[0],
            self.country[1],
        ])
    }

    /// Asymmetric match predicate: does this candidate configuration
    /// apply under `settings`? Unconstrained dimensions always pass;
    /// constrained ones must equal the requested value, or stay below it
    /// for the size-ordered dimensions.
    pub fn matches(&self, settings: &ResTableConfig) -> bool {
        if self.imsi() != 0 {
            if self.mcc != 0 && self.mcc != settings.mcc {
                return false;
            }
            if self.mnc != 0 && self.mnc != settings.mnc {
                return false;
            }
        }

        if self.locale() != 0 {
            if self.language != [0, 0] && self.language != settings.language {
                return false;
            }
            if self.country != [0, 0] && self.country != settings.country {
                return false;
            }
        }

        if self.screen_layout != 0 || settings.screen_layout != 0 {
            let size = self.screen_layout & MASK_SCREENSIZE;
            let set_size = settings.screen_layout & MASK_SCREENSIZE;
            // a candidate asking for a larger screen than the device has
            // never applies; smaller-than-requested is fine
            if size != 0 && size > set_size {
                return false;
            }

            let long = self.screen_layout & MASK_SCREENLONG;
            let set_long = settings.screen_layout & MASK_SCREENLONG;
            if long != 0 && long != set_long {
                return false;
            }
        }

        if self.ui_mode != 0 || settings.ui_mode != 0 {
            let ui_type = self.ui_mode & MASK_UI_MODE_TYPE;
            let set_type = settings.ui_mode & MASK_UI_MODE_TYPE;
            if ui_type != 0 && ui_type != set_type {
                return false;
            }

            let night = self.ui_mode & MASK_UI_MODE_NIGHT;
            let set_night = settings.ui_mode & MASK_UI_MODE_NIGHT;
            if night != 0 && night != set_night {
                return false;
            }
        }

        if self.smallest_screen_width_dp != 0
            && self.smallest_screen_width_dp > settings.smallest_screen_width_dp
        {
            return false;
        }

        if self.screen_width_dp != 0 && self.screen_width_dp > settings.screen_width_dp {
            return false;
        }
        if self.screen_height_dp != 0 && self.screen_height_dp > settings.screen_height_dp {
            return false;
        }

        if self.orientation != 0 && self.orientation != settings.orientation {
            return false;
        }
        // density is never matched here: any density is usable because
        // values get scaled, and ranking decides which scale is cheapest
        if self.touchscreen != 0 && self.touchscreen != settings.touchscreen {
            return false;
        }

        if self.input_flags != 0 || settings.input_flags != 0 {
            let keys = self.input_flags & MASK_KEYSHIDDEN;
            let set_keys = settings.input_flags & MASK_KEYSHIDDEN;
            if keys != 0 && keys != set_keys {
                // a device with a hidden hardware keyboard exposing a soft
                // keyboard still counts as "keys exposed"
                if keys != KEYSHIDDEN_NO || set_keys != KEYSHIDDEN_SOFT {
                    return false;
                }
            }

            let nav = self.input_flags & MASK_NAVHIDDEN;
            let set_nav = settings.input_flags & MASK_NAVHIDDEN;
            if nav != 0 && nav != set_nav {
                return false;
            }
        }

        if self.keyboard != 0 && self.keyboard != settings.keyboard {
            return false;
        }
        if self.navigation != 0 && self.navigation != settings.navigation {
            return false;
        }

        if self.screen_width != 0 && self.screen_width > settings.screen_width {
            return false;
        }
        if self.screen_height != 0 && self.screen_height > settings.screen_height {
            return false;
        }

        if self.sdk_version != 0 && self.sdk_version > settings.sdk_version {
            return false;
        }
        if self.minor_version != 0 && self.minor_version != settings.minor_version {
            return false;
        }

        true
    }

    /// Rank two candidates that both already passed [`matches`] against
    /// the same `requested` configuration. The first dimension in the
    /// priority cascade that discriminates decides; with no `requested`
    /// config the comparison degrades to [`is_more_specific_than`].
    pub fn is_better_than(
        &self,
        o: &ResTableConfig,
        requested: Option<&ResTableConfig>,
    ) -> bool {
        let Some(requested) = requested else {
            return self.is_more_specific_than(o);
        };

        if self.imsi() != 0 || o.imsi() != 0 {
            if self.mcc != o.mcc && requested.mcc != 0 {
                return self.mcc != 0;
            }
            if self.mnc != o.mnc && requested.mnc != 0 {
                return self.mnc != 0;
            }
        }

        if self.locale() != 0 || o.locale() != 0 {
            if self.language != o.language && requested.language != [0, 0] {
                return self.language != [0, 0];
            }
            if self.country != o.country && requested.country != [0, 0] {
                return self.country != [0, 0];
            }
        }

        if self.smallest_screen_width_dp != 0 || o.smallest_screen_width_dp != 0 {
            // both candidates are <= requested, so the larger one is closer
            if self.smallest_screen_width_dp != o.smallest_screen_width_dp {
                return self.smallest_screen_width_dp > o.smallest_screen_width_dp;
            }
        }

        if self.screen_width_dp != 0
            || self.screen_height_dp != 0
            || o.screen_width_dp != 0
            || o.screen_height_dp != 0
        {
            let mut my_delta: i32 = 0;
            let mut other_delta: i32 = 0;
            if requested.screen_width_dp != 0 {
                my_delta += requested.screen_width_dp as i32 - self.screen_width_dp as i32;
                other_delta += requested.screen_width_dp as i32 - o.screen_width_dp as i32;
            }
            if requested.screen_height_dp != 0 {
                my_delta += requested.screen_height_dp as i32 - self.screen_height_dp as i32;
                other_delta += requested.screen_height_dp as i32 - o.screen_height_dp as i32;
            }
            if my_delta != other_delta {
                return my_delta < other_delta;
            }
        }

        if self.screen_layout != 0 || o.screen_layout != 0 {
            if (self.screen_layout ^ o.screen_layout) & MASK_SCREENSIZE != 0
                && requested.screen_layout & MASK_SCREENSIZE != 0
            {
                let my_size = self.screen_layout & MASK_SCREENSIZE;
                let o_size = o.screen_layout & MASK_SCREENSIZE;
                let mut fixed_my_size = my_size;
                let mut fixed_o_size = o_size;
                // an unset bucket is implicitly "normal" once the device
                // is at least normal-sized
                if requested.screen_layout & MASK_SCREENSIZE >= SCREENSIZE_NORMAL {
                    if fixed_my_size == 0 {
                        fixed_my_size = SCREENSIZE_NORMAL;
                    }
                    if fixed_o_size == 0 {
                        fixed_o_size = SCREENSIZE_NORMAL;
                    }
                }
                if fixed_my_size == fixed_o_size {
                    // only the coercion made them equal; the explicit one wins
                    return my_size != 0;
                }
                return fixed_my_size > fixed_o_size;
            }

            if (self.screen_layout ^ o.screen_layout) & MASK_SCREENLONG != 0
                && requested.screen_layout & MASK_SCREENLONG != 0
            {
                return self.screen_layout & MASK_SCREENLONG != 0;
            }
        }

        if self.orientation != o.orientation && requested.orientation != 0 {
            return self.orientation != 0;
        }

        if (self.ui_mode ^ o.ui_mode) & MASK_UI_MODE_TYPE != 0
            && requested.ui_mode & MASK_UI_MODE_TYPE != 0
        {
            return self.ui_mode & MASK_UI_MODE_TYPE != 0;
        }
        if (self.ui_mode ^ o.ui_mode) & MASK_UI_MODE_NIGHT != 0
            && requested.ui_mode & MASK_UI_MODE_NIGHT != 0
        {
            return self.ui_mode & MASK_UI_MODE_NIGHT != 0;
        }

        if self.density != o.density {
            return self.density_is_better(o, requested);
        }

        if self.touchscreen != o.touchscreen && requested.touchscreen != 0 {
            return self.touchscreen != 0;
        }

        if self.input_flags != 0 || o.input_flags != 0 {
            let keys = self.input_flags & MASK_KEYSHIDDEN;
            let o_keys = o.input_flags & MASK_KEYSHIDDEN;
            if keys != o_keys {
                let req_keys = requested.input_flags & MASK_KEYSHIDDEN;
                if req_keys != 0 {
                    if keys == 0 {
                        return false;
                    }
                    if o_keys == 0 {
                        return true;
                    }
                    // NO and SOFT both matched; the exact value is closer
                    if req_keys == keys {
                        return true;
                    }
                    if req_keys == o_keys {
                        return false;
                    }
                }
            }

            let nav = self.input_flags & MASK_NAVHIDDEN;
            let o_nav = o.input_flags & MASK_NAVHIDDEN;
            if nav != o_nav && requested.input_flags & MASK_NAVHIDDEN != 0 {
                return nav != 0;
            }
        }

        if self.keyboard != o.keyboard && requested.keyboard != 0 {
            return self.keyboard != 0;
        }
        if self.navigation != o.navigation && requested.navigation != 0 {
            return self.navigation != 0;
        }

        if self.screen_width != 0
            || self.screen_height != 0
            || o.screen_width != 0
            || o.screen_height != 0
        {
            let mut my_delta: i32 = 0;
            let mut other_delta: i32 = 0;
            if requested.screen_width != 0 {
                my_delta += requested.screen_width as i32 - self.screen_width as i32;
                other_delta += requested.screen_width as i32 - o.screen_width as i32;
            }
            if requested.screen_height != 0 {
                my_delta += requested.screen_height as i32 - self.screen_height as i32;
                other_delta += requested.screen_height as i32 - o.screen_height as i32;
            }
            if my_delta != other_delta {
                return my_delta < other_delta;
            }
        }

        if self.sdk_version != 0
            || self.minor_version != 0
            || o.sdk_version != 0
            || o.minor_version != 0
        {
            if self.sdk_version != o.sdk_version && requested.sdk_version != 0 {
                return self.sdk_version > o.sdk_version;
            }
            if self.minor_version != o.minor_version && requested.minor_version != 0 {
                return self.minor_version != 0;
            }
        }

        false
    }

    /// Scaling-cost heuristic for the density dimension. Unset densities
    /// count as medium (160); the candidate whose value needs the smaller
    /// scale factor wins, with the low side given a 2x advantage.
    fn density_is_better(&self, o: &ResTableConfig, requested: &ResTableConfig) -> bool {
        let mine = if self.density != 0 {
            self.density as i32
        } else {
            DENSITY_MEDIUM as i32
        };
        let other = if o.density != 0 {
            o.density as i32
        } else {
            DENSITY_MEDIUM as i32
        };

        let (l, h, i_am_higher) = if mine > other {
            (other, mine, true)
        } else {
            (mine, other, false)
        };

        let req = if requested.density != 0 {
            requested.density as i32
        } else {
            DENSITY_MEDIUM as i32
        };

        // requested at or above both candidates: take the higher one
        if req >= h {
            return i_am_higher;
        }
        // requested at or below both candidates: take the lower one
        if req <= l {
            return !i_am_higher;
        }
        // in between: weigh the two scale factors against each other
        if (2 * l - req) * h > req * req {
            i_am_higher
        } else {
            !i_am_higher
        }
    }

    /// Same cascade as [`is_better_than`] but with no target to be close
    /// to: a constrained dimension beats an unconstrained one.
    pub fn is_more_specific_than(&self, o: &ResTableConfig) -> bool {
        macro_rules! more_specific {
            ($mine:expr, $other:expr, $unset:expr) => {
                if $mine != $other {
                    if $mine == $unset {
                        return false;
                    }
                    if $other == $unset {
                        return true;
                    }
                }
            };
        }

        more_specific!(self.mcc, o.mcc, 0);
        more_specific!(self.mnc, o.mnc, 0);
        more_specific!(self.language, o.language, [0u8, 0u8]);
        more_specific!(self.country, o.country, [0u8, 0u8]);
        more_specific!(self.smallest_screen_width_dp, o.smallest_screen_width_dp, 0);
        more_specific!(self.screen_width_dp, o.screen_width_dp, 0);
        more_specific!(self.screen_height_dp, o.screen_height_dp, 0);
        more_specific!(
            self.screen_layout & MASK_SCREENSIZE,
            o.screen_layout & MASK_SCREENSIZE,
            0
        );
        more_specific!(
            self.screen_layout & MASK_SCREENLONG,
            o.screen_layout & MASK_SCREENLONG,
            0
        );
        more_specific!(self.orientation, o.orientation, 0);
        more_specific!(
            self.ui_mode & MASK_UI_MODE_TYPE,
            o.ui_mode & MASK_UI_MODE_TYPE,
            0
        );
        more_specific!(
            self.ui_mode & MASK_UI_MODE_NIGHT,
            o.ui_mode & MASK_UI_MODE_NIGHT,
            0
        );
        more_specific!(self.density, o.density, 0);
        more_specific!(self.touchscreen, o.touchscreen, 0);
        more_specific!(
            self.input_flags & MASK_KEYSHIDDEN,
            o.input_flags & MASK_KEYSHIDDEN,
            0
        );
        more_specific!(
            self.input_flags & MASK_NAVHIDDEN,
            o.input_flags & MASK_NAVHIDDEN,
            0
        );
        more_specific!(self.keyboard, o.keyboard, 0);
        more_specific!(self.navigation, o.navigation, 0);
        more_specific!(self.screen_width, o.screen_width, 0);
        more_specific!(self.screen_height, o.screen_height, 0);
        more_specific!(self.sdk_version, o.sdk_version, 0);
        more_specific!(self.minor_version, o.minor_version, 0);

        false
    }

    /// Which dimension groups differ at all between the two configs
    pub fn diff(&self, o: &ResTableConfig) -> ConfigFlags {
        let mut diffs = ConfigFlags::empty();
        if self.mcc != o.mcc {
            diffs |= ConfigFlags::CONFIG_MCC;
        }
        if self.mnc != o.mnc {
            diffs |= ConfigFlags::CONFIG_MNC;
        }
        if self.language != o.language || self.country != o.country {
            diffs |= ConfigFlags::CONFIG_LOCALE;
        }
        if self.orientation != o.orientation {
            diffs |= ConfigFlags::CONFIG_ORIENTATION;
        }
        if self.touchscreen != o.touchscreen {
            diffs |= ConfigFlags::CONFIG_TOUCHSCREEN;
        }
        if self.density != o.density {
            diffs |= ConfigFlags::CONFIG_DENSITY;
        }
        if self.keyboard != o.keyboard {
            diffs |= ConfigFlags::CONFIG_KEYBOARD;
        }
        if self.navigation != o.navigation {
            diffs |= ConfigFlags::CONFIG_NAVIGATION;
        }
        if self.input_flags != o.input_flags {
            diffs |= ConfigFlags::CONFIG_KEYBOARD_HIDDEN;
        }
        if self.screen_width != o.screen_width
            || self.screen_height != o.screen_height
            || self.screen_width_dp != o.screen_width_dp
            || self.screen_height_dp != o.screen_height_dp
        {
            diffs |= ConfigFlags::CONFIG_SCREEN_SIZE;
        }
        if self.screen_layout != o.screen_layout {
            diffs |= ConfigFlags::CONFIG_SCREEN_LAYOUT;
        }
        if self.ui_mode != o.ui_mode {
            diffs |= ConfigFlags::CONFIG_UI_MODE;
        }
        if self.smallest_screen_width_dp != o.smallest_screen_width_dp {
            diffs |= ConfigFlags::CONFIG_SMALLEST_SCREEN_SIZE;
        }
        if self.sdk_version != o.sdk_version || self.minor_version != o.minor_version {
            diffs |= ConfigFlags::CONFIG_VERSION;
        }
        diffs
    }

    /// Locale rendered the way qualifier directories spell it:
    /// `xx` or `xx-rYY`, `None` when unconstrained
    pub fn locale_string(&self) -> Option<String> {
        if self.language == [0, 0] {
            return None;
        }
        let mut out = String::with_capacity(6);
        out.push(self.language[0] as char);
        out.push(self.language[1] as char);
        if self.country != [0, 0] {
            out.push_str("-r");
            out.push(self.country[0] as char);
            out.push(self.country[1] as char);
        }
        Some(out)
    }

    /// Render the full qualifier string (`mcc310-fr-rFR-land-hdpi-...`),
    /// empty for the default configuration
    pub fn to_qualifier_string(&self) -> String {
        let mut result = String::new();

        let push = |result: &mut String, part: &str| {
            if !result.is_empty() {
                result.push('-');
            }
            result.push_str(part);
        };

        if self.mcc != 0 {
            let mut s = String::new();
            let _ = write!(s, "mcc{}", self.mcc);
            push(&mut result, &s);
        }
        if self.mnc != 0 {
            let mut s = String::new();
            let _ = write!(s, "mnc{}", self.mnc);
            push(&mut result, &s);
        }
        if let Some(locale) = self.locale_string() {
            push(&mut result, &locale);
        }
        if self.smallest_screen_width_dp != 0 {
            let mut s = String::new();
            let _ = write!(s, "sw{}dp", self.smallest_screen_width_dp);
            push(&mut result, &s);
        }
        if self.screen_width_dp != 0 {
            let mut s = String::new();
            let _ = write!(s, "w{}dp", self.screen_width_dp);
            push(&mut result, &s);
        }
        if self.screen_height_dp != 0 {
            let mut s = String::new();
            let _ = write!(s, "h{}dp", self.screen_height_dp);
            push(&mut result, &s);
        }
        match self.screen_layout & MASK_SCREENSIZE {
            SCREENSIZE_SMALL => push(&mut result, "small"),
            SCREENSIZE_NORMAL => push(&mut result, "normal"),
            SCREENSIZE_LARGE => push(&mut result, "large"),
            SCREENSIZE_XLARGE => push(&mut result, "xlarge"),
            _ => {}
        }
        match self.screen_layout & MASK_SCREENLONG {
            SCREENLONG_NO => push(&mut result, "notlong"),
            SCREENLONG_YES => push(&mut result, "long"),
            _ => {}
        }
        match self.orientation {
            ORIENTATION_PORT => push(&mut result, "port"),
            ORIENTATION_LAND => push(&mut result, "land"),
            ORIENTATION_SQUARE => push(&mut result, "square"),
            _ => {}
        }
        match self.ui_mode & MASK_UI_MODE_TYPE {
            UI_MODE_TYPE_DESK => push(&mut result, "desk"),
            UI_MODE_TYPE_CAR => push(&mut result, "car"),
            UI_MODE_TYPE_TELEVISION => push(&mut result, "television"),
            _ => {}
        }
        match self.ui_mode & MASK_UI_MODE_NIGHT {
            UI_MODE_NIGHT_NO => push(&mut result, "notnight"),
            UI_MODE_NIGHT_YES => push(&mut result, "night"),
            _ => {}
        }
        match self.density {
            DENSITY_DEFAULT => {}
            DENSITY_LOW => push(&mut result, "ldpi"),
            DENSITY_MEDIUM => push(&mut result, "mdpi"),
            DENSITY_HIGH => push(&mut result, "hdpi"),
            320 => push(&mut result, "xhdpi"),
            DENSITY_NONE => push(&mut result, "nodpi"),
            d => {
                let mut s = String::new();
                let _ = write!(s, "{}dpi", d);
                push(&mut result, &s);
            }
        }
        match self.touchscreen {
            TOUCHSCREEN_NOTOUCH => push(&mut result, "notouch"),
            TOUCHSCREEN_STYLUS => push(&mut result, "stylus"),
            TOUCHSCREEN_FINGER => push(&mut result, "finger"),
            _ => {}
        }
        match self.input_flags & MASK_KEYSHIDDEN {
            KEYSHIDDEN_NO => push(&mut result, "keysexposed"),
            KEYSHIDDEN_YES => push(&mut result, "keyshidden"),
            KEYSHIDDEN_SOFT => push(&mut result, "keyssoft"),
            _ => {}
        }
        match self.keyboard {
            KEYBOARD_NOKEYS => push(&mut result, "nokeys"),
            KEYBOARD_QWERTY => push(&mut result, "qwerty"),
            KEYBOARD_12KEY => push(&mut result, "12key"),
            _ => {}
        }
        match self.input_flags & MASK_NAVHIDDEN {
            NAVHIDDEN_NO => push(&mut result, "navexposed"),
            NAVHIDDEN_YES => push(&mut result, "navhidden"),
            _ => {}
        }
        match self.navigation {
            NAVIGATION_NONAV => push(&mut result, "nonav"),
            NAVIGATION_DPAD => push(&mut result, "dpad"),
            NAVIGATION_TRACKBALL => push(&mut result, "trackball"),
            NAVIGATION_WHEEL => push(&mut result, "wheel"),
            _ => {}
        }
        if self.screen_width != 0 || self.screen_height != 0 {
            let mut s = String::new();
            let _ = write!(s, "{}x{}", self.screen_width, self.screen_height);
            push(&mut result, &s);
        }
        if self.sdk_version != 0 {
            let mut s = String::new();
            let _ = write!(s, "v{}", self.sdk_version);
            if self.minor_version != 0 {
                let _ = write!(s, ".{}", self.minor_version);
            }
            push(&mut result, &s);
        }

        result
    }
}
