use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::foundation::error::{PushmockError, PushmockResult};
use crate::scene::model::{AnimParams, Avatar, AvatarImage, Card, Scene, Stage, TextRun};

/// Persisted document form. Top-level sections are optional so partial and
/// older snapshots merge into the current scene instead of erroring. The card
/// section is named `push` and the avatar section `img` on the wire.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    #[serde(rename = "push", default, skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,
    #[serde(rename = "img", default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<Avatar>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texts: Option<Vec<TextRun>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anim: Option<AnimParams>,
}

impl Scene {
    /// Capture the persisted fields. Runtime flags and the selection are
    /// excluded; the avatar travels as its base64 payload only.
    pub fn snapshot(&self) -> SceneSnapshot {
        let mut avatar = self.avatar.clone();
        avatar.image = None;
        SceneSnapshot {
            stage: Some(self.stage.clone()),
            card: Some(self.card.clone()),
            avatar: Some(avatar),
            texts: Some(self.texts.clone()),
            anim: Some(self.anim.clone()),
        }
    }

    /// Merge a snapshot into the scene. Missing sections keep current
    /// values. The avatar image is re-decoded from the payload; a decode
    /// failure resets the avatar slot rather than leaving it half-loaded.
    /// Runtime flags and the selection are reset.
    pub fn restore(&mut self, snap: &SceneSnapshot) {
        if let Some(stage) = &snap.stage {
            self.stage = stage.clone();
        }
        if let Some(card) = &snap.card {
            self.card = card.clone();
        }
        if let Some(avatar) = &snap.avatar {
            self.avatar = avatar.clone();
            match &self.avatar.payload {
                Some(payload) => match decode_avatar_payload(payload) {
                    Ok(image) => self.avatar.image = Some(image),
                    Err(err) => {
                        tracing::warn!(%err, "avatar payload decode failed, clearing slot");
                        self.avatar.image = None;
                        self.avatar.payload = None;
                    }
                },
                None => self.avatar.image = None,
            }
        }
        if let Some(texts) = &snap.texts {
            self.texts = texts.clone();
        }
        if let Some(anim) = &snap.anim {
            self.anim = anim.clone();
        }
        self.runtime = Default::default();
        self.selection.clear();
    }
}

/// Encode decoded avatar pixels as the stable persisted payload
/// (a PNG data URL, matching what older templates carry).
pub fn encode_avatar_payload(image: &AvatarImage) -> PushmockResult<String> {
    let buf = image::RgbaImage::from_raw(image.width, image.height, image.rgba.clone())
        .ok_or_else(|| PushmockError::serde("avatar pixel buffer has wrong length"))?;
    let mut png = Vec::new();
    buf.write_to(
        &mut std::io::Cursor::new(&mut png),
        image::ImageFormat::Png,
    )
    .map_err(|e| PushmockError::serde(format!("avatar png encode failed: {e}")))?;
    let b64 = base64::engine::general_purpose::STANDARD.encode(&png);
    Ok(format!("data:image/png;base64,{b64}"))
}

/// Decode a persisted avatar payload (data URL or bare base64) back into
/// RGBA pixels.
pub fn decode_avatar_payload(payload: &str) -> PushmockResult<AvatarImage> {
    let b64 = match payload.split_once(";base64,") {
        Some((_, rest)) => rest,
        None => payload,
    };
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(b64.trim())
        .map_err(|e| PushmockError::serde(format!("avatar payload is not base64: {e}")))?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| PushmockError::serde(format!("avatar image decode failed: {e}")))?
        .to_rgba8();
    Ok(AvatarImage {
        width: img.width(),
        height: img.height(),
        rgba: img.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::model::SelectTarget;

    fn tiny_avatar() -> AvatarImage {
        AvatarImage {
            width: 2,
            height: 2,
            rgba: vec![255; 16],
        }
    }

    #[test]
    fn snapshot_roundtrip_preserves_persisted_fields() {
        let mut scene = Scene::new();
        scene.card.x = 12.0;
        scene.texts[0].text = "hello [world:42]".into();
        scene.anim.hold = 3.3;
        scene.runtime.playing = true;
        scene.selection.target = Some(SelectTarget::Card);

        let snap = scene.snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        let back: SceneSnapshot = serde_json::from_str(&json).unwrap();

        let mut restored = Scene::new();
        restored.restore(&back);
        assert_eq!(restored.card, scene.card);
        assert_eq!(restored.texts, scene.texts);
        assert_eq!(restored.anim, scene.anim);
        // Runtime and selection never travel.
        assert!(!restored.runtime.playing);
        assert!(restored.selection.target.is_none());
    }

    #[test]
    fn wire_format_uses_legacy_section_names() {
        let snap = Scene::new().snapshot();
        let v: serde_json::Value = serde_json::to_value(&snap).unwrap();
        assert!(v.get("push").is_some());
        assert!(v.get("img").is_some());
        assert!(v.get("card").is_none());
        assert_eq!(v["anim"]["in"], serde_json::json!(0.6));
        assert_eq!(v["img"]["offX"], serde_json::json!(0.0));
    }

    #[test]
    fn missing_sections_keep_current_values() {
        let mut scene = Scene::new();
        scene.card.x = 321.0;
        let partial: SceneSnapshot =
            serde_json::from_str(r##"{"stage":{"w":720,"h":1280,"bg":"#000000"}}"##).unwrap();
        scene.restore(&partial);
        assert_eq!(scene.stage.w, 720.0);
        assert_eq!(scene.stage.bg_alpha, 1.0);
        assert_eq!(scene.card.x, 321.0);
        assert_eq!(scene.texts.len(), 3);
    }

    #[test]
    fn old_templates_get_blur_default() {
        let snap: SceneSnapshot = serde_json::from_str(
            r##"{"texts":[{"id":"t1","text":"hi","x":0,"y":0,"family":"Inter",
                "weight":"400","size":30,"color":"#333333","align":"left","line":1.15}]}"##,
        )
        .unwrap();
        let mut scene = Scene::new();
        scene.restore(&snap);
        assert_eq!(scene.texts.len(), 1);
        assert_eq!(scene.texts[0].blur_intensity, 10);
    }

    #[test]
    fn sparse_section_fields_fall_back_to_seeds() {
        use crate::scene::model::{AvatarShape, Direction};
        let snap: SceneSnapshot = serde_json::from_str(
            r##"{"push":{"x":5},"img":{"shape":"circle"},"anim":{"in":0.2}}"##,
        )
        .unwrap();
        let mut scene = Scene::new();
        scene.restore(&snap);
        // Present fields land; everything missing keeps the seeded values.
        assert_eq!(scene.card.x, 5.0);
        assert_eq!(scene.card.w, 960.0);
        assert_eq!(scene.card.padding, 20.0);
        assert_eq!(scene.avatar.shape, AvatarShape::Circle);
        assert_eq!(scene.avatar.size, 120.0);
        assert_eq!(scene.anim.enter, 0.2);
        assert_eq!(scene.anim.hold, 1.4);
        assert_eq!(scene.anim.out_direction, Direction::Top);
        scene.validate().unwrap();
    }

    #[test]
    fn avatar_payload_roundtrip() {
        let img = tiny_avatar();
        let payload = encode_avatar_payload(&img).unwrap();
        assert!(payload.starts_with("data:image/png;base64,"));
        let back = decode_avatar_payload(&payload).unwrap();
        assert_eq!(back, img);
    }

    #[test]
    fn corrupt_payload_resets_avatar_slot() {
        let mut scene = Scene::new();
        scene.avatar.payload = Some("data:image/png;base64,!!notbase64!!".into());
        let snap = scene.snapshot();
        let mut restored = Scene::new();
        restored.restore(&snap);
        assert!(restored.avatar.image.is_none());
        assert!(restored.avatar.payload.is_none());
    }
}
