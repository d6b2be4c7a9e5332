// src/exiftool/tag.rs

use std::fmt;
use std::str::FromStr;

use crate::errors::StayOpenError;

macro_rules! tags {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Metadata tags understood by the facade, with their tool names.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Tag {
            $($variant),+
        }

        impl Tag {
            /// Every known tag, in declaration order.
            pub const ALL: &'static [Tag] = &[$(Tag::$variant),+];

            /// Name used on the command line and in `-S` output.
            pub fn name(self) -> &'static str {
                match self {
                    $(Tag::$variant => $name),+
                }
            }
        }
    };
}

tags! {
    Aperture => "ApertureValue",
    Artist => "Artist",
    ColorSpace => "ColorSpace",
    Comment => "Comment",
    Copyright => "Copyright",
    CreateDate => "CreateDate",
    DateTimeOriginal => "DateTimeOriginal",
    Description => "ImageDescription",
    ExposureTime => "ExposureTime",
    Flash => "Flash",
    FNumber => "FNumber",
    FocalLength => "FocalLength",
    GpsAltitude => "GPSAltitude",
    GpsLatitude => "GPSLatitude",
    GpsLongitude => "GPSLongitude",
    ImageHeight => "ImageHeight",
    ImageWidth => "ImageWidth",
    Iso => "ISO",
    Keywords => "Keywords",
    Make => "Make",
    MimeType => "MIMEType",
    Model => "Model",
    ModifyDate => "ModifyDate",
    Orientation => "Orientation",
    Rating => "Rating",
    Software => "Software",
    Title => "Title",
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tag {
    type Err = StayOpenError;

    /// Look a tag up by its tool name (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Tag::ALL
            .iter()
            .copied()
            .find(|tag| tag.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| StayOpenError::InvalidArgument(format!("unknown tag '{wanted}'")))
    }
}
