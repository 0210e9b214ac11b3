// ============================================================================
// BANNER VIEWMODEL - aviso de modo offline / cola pendiente
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerTone {
    Offline,
    Syncing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Banner {
    pub tone: BannerTone,
    pub text: String,
}

/// `None` = online sin nada en cola, el banner se oculta
pub fn banner(is_online: bool, queued: usize) -> Option<Banner> {
    if !is_online {
        return Some(Banner {
            tone: BannerTone::Offline,
            text: "Offline mode: actions will sync when back online.".to_string(),
        });
    }
    if queued == 0 {
        return None;
    }
    Some(Banner {
        tone: BannerTone::Syncing,
        text: format!(
            "Submitting {} queued change{}…",
            queued,
            if queued == 1 { "" } else { "s" }
        ),
    })
}

/// Longitud de una cola serializada; ilegible cuenta como vacía
pub fn queued_count(raw: Option<&str>) -> usize {
    raw.and_then(|raw| serde_json::from_str::<Vec<serde_json::Value>>(raw).ok())
        .map(|entries| entries.len())
        .unwrap_or(0)
}
