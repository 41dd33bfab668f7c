//! Status enums stored as lowercase TEXT columns.
//!
//! Each enum variant maps to exactly one database string. Rows are decoded
//! through `TryFrom<String>` so the db crate can use
//! `#[sqlx(try_from = "String")]` without this crate depending on sqlx.

use crate::error::CoreError;

macro_rules! define_status_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $val)] $variant ),+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Return the database string for this variant.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $val ),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $val => Ok($name::$variant), )+
                    other => Err(CoreError::Validation(format!(
                        concat!("Unknown ", stringify!($name), " '{}'"),
                        other
                    ))),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }
    };
}

define_status_enum! {
    /// Playback lifecycle of a video.
    VideoStatus {
        Uploading = "uploading",
        Processing = "processing",
        Ready = "ready",
        Deleted = "deleted",
    }
}

define_status_enum! {
    /// Transcript sub-state-machine, independent of [`VideoStatus`].
    TranscriptStatus {
        None = "none",
        Pending = "pending",
        Processing = "processing",
        Ready = "ready",
        Failed = "failed",
        /// The source has no audio track. Terminal, not an error.
        NoAudio = "no_audio",
    }
}

define_status_enum! {
    /// AI summary state, only advanced after a transcript is ready.
    SummaryStatus {
        None = "none",
        Pending = "pending",
        Processing = "processing",
        Ready = "ready",
        Failed = "failed",
    }
}

impl VideoStatus {
    fn rank(self) -> u8 {
        match self {
            Self::Uploading => 0,
            Self::Processing => 1,
            Self::Ready => 2,
            Self::Deleted => 3,
        }
    }

    /// Whether moving from `self` to `next` is a legal lifecycle step.
    ///
    /// Statuses move forward only, with two exceptions: `deleted` is
    /// reachable from every other status, and a ready video may drop back
    /// to `processing` while it is being trimmed. `deleted` is terminal.
    pub fn can_transition_to(self, next: VideoStatus) -> bool {
        match (self, next) {
            (Self::Deleted, _) => false,
            (_, Self::Deleted) => true,
            (Self::Ready, Self::Processing) => true,
            (current, next) => next.rank() > current.rank(),
        }
    }

    /// Whether the video can be played back.
    pub fn is_playable(self) -> bool {
        self == Self::Ready
    }
}

impl TranscriptStatus {
    /// Terminal until an explicit retry restarts the pipeline.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed | Self::NoAudio)
    }

    /// Statuses from which the pipeline may enter `processing`.
    pub const STARTABLE: [TranscriptStatus; 2] = [Self::None, Self::Pending];

    /// Statuses an explicit retry may reset to `pending`. `no_audio` is
    /// never retried.
    pub const RETRIABLE: [TranscriptStatus; 1] = [Self::Failed];
}
