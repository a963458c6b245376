use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all(deserialize = "camelCase"))]
pub struct Camera {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    pub enabled: bool,
    pub resolution: Resolution,
    #[serde(default)]
    pub status: CameraStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraStatus {
    #[serde(default)]
    pub websocket: bool,
    #[serde(default)]
    pub hls: bool,
}

/// Frame size of a camera feed.
///
/// The proxy reports `{"width": .., "height": ..}` while the dashboard has
/// always exchanged a `[width, height]` pair; both are accepted, the pair is
/// written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ResolutionRepr", into = "(u32, u32)")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new(1280, 720)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ResolutionRepr {
    Pair(u32, u32),
    Object { width: u32, height: u32 },
}

impl From<ResolutionRepr> for Resolution {
    fn from(value: ResolutionRepr) -> Self {
        match value {
            ResolutionRepr::Pair(width, height) | ResolutionRepr::Object { width, height } => {
                Self { width, height }
            }
        }
    }
}

impl From<Resolution> for (u32, u32) {
    fn from(value: Resolution) -> Self {
        (value.width, value.height)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CamerasRawResponse {
    pub cameras: Vec<Camera>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HlsResponse {
    pub status: String,
    #[serde(default)]
    pub hls_url: Option<String>,
}
