use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::models::queue::PendingToggle;

/// Estado actual de fichaje de un miembro (copia autoritativa en el backend)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub member_id: String,
    pub is_in: bool,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub elapsed_sec: Option<u64>,
}

impl StatusEntry {
    fn clocked_out(member_id: &str) -> Self {
        Self {
            member_id: member_id.to_string(),
            is_in: false,
            started_at: None,
            elapsed_sec: None,
        }
    }
}

/// Un slot del tablero: confirmado por el servidor u optimista
/// (toggles locales aún sin confirmar encima del último valor conocido).
#[derive(Debug, Clone, PartialEq)]
pub enum StatusSlot {
    Confirmed(StatusEntry),
    Optimistic {
        entry: StatusEntry,
        pending_ids: Vec<String>,
    },
}

impl StatusSlot {
    pub fn entry(&self) -> &StatusEntry {
        match self {
            StatusSlot::Confirmed(entry) => entry,
            StatusSlot::Optimistic { entry, .. } => entry,
        }
    }

    pub fn is_optimistic(&self) -> bool {
        matches!(self, StatusSlot::Optimistic { .. })
    }
}

/// Tablero de estado del equipo visible en el kiosk
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusBoard {
    slots: BTreeMap<String, StatusSlot>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tablero con todo confirmado a partir de un snapshot del servidor
    pub fn from_snapshot(entries: Vec<StatusEntry>) -> Self {
        let slots = entries
            .into_iter()
            .map(|entry| (entry.member_id.clone(), StatusSlot::Confirmed(entry)))
            .collect();
        Self { slots }
    }

    /// Reconstruye el tablero desde un snapshot y vuelve a aplicar, en orden
    /// FIFO, los toggles de `team_id` que siguen en la cola.
    pub fn reconcile(entries: Vec<StatusEntry>, pending: &[PendingToggle], team_id: &str) -> Self {
        let mut board = Self::from_snapshot(entries);
        for toggle in pending.iter().filter(|t| t.team_id == team_id) {
            board.apply_optimistic_toggle(toggle);
        }
        board
    }

    /// Invierte localmente el estado del miembro del toggle
    pub fn apply_optimistic_toggle(&mut self, toggle: &PendingToggle) {
        let (mut entry, mut pending_ids) = match self.slots.remove(&toggle.member_id) {
            Some(StatusSlot::Confirmed(entry)) => (entry, Vec::new()),
            Some(StatusSlot::Optimistic { entry, pending_ids }) => (entry, pending_ids),
            None => (StatusEntry::clocked_out(&toggle.member_id), Vec::new()),
        };

        entry.is_in = !entry.is_in;
        entry.started_at = if entry.is_in {
            millis_to_iso(toggle.created_at)
        } else {
            None
        };
        entry.elapsed_sec = None;
        pending_ids.push(toggle.id.clone());

        self.slots.insert(
            toggle.member_id.clone(),
            StatusSlot::Optimistic { entry, pending_ids },
        );
    }

    /// El servidor aceptó `toggle_id`. El slot sigue optimista aunque no le
    /// queden toggles: sólo un snapshot del servidor lo pasa a confirmado.
    pub fn settle(&mut self, toggle_id: &str) {
        for slot in self.slots.values_mut() {
            if let StatusSlot::Optimistic { pending_ids, .. } = slot {
                if let Some(pos) = pending_ids.iter().position(|id| id == toggle_id) {
                    pending_ids.remove(pos);
                    return;
                }
            }
        }
    }

    /// Toggles aún sin respuesta del servidor para el miembro
    pub fn pending_count(&self, member_id: &str) -> usize {
        match self.slot(member_id) {
            Some(StatusSlot::Optimistic { pending_ids, .. }) => pending_ids.len(),
            _ => 0,
        }
    }

    pub fn slot(&self, member_id: &str) -> Option<&StatusSlot> {
        self.slots.get(member_id)
    }

    pub fn is_in(&self, member_id: &str) -> bool {
        self.slot(member_id).map(|s| s.entry().is_in).unwrap_or(false)
    }

    pub fn started_at(&self, member_id: &str) -> Option<&str> {
        self.slot(member_id)
            .and_then(|s| s.entry().started_at.as_deref())
    }

    pub fn is_optimistic(&self, member_id: &str) -> bool {
        self.slot(member_id).map(StatusSlot::is_optimistic).unwrap_or(false)
    }

    pub fn clocked_in_count(&self) -> usize {
        self.slots.values().filter(|s| s.entry().is_in).count()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

fn millis_to_iso(ms: i64) -> Option<String> {
    DateTime::from_timestamp_millis(ms).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(member_id: &str, is_in: bool) -> StatusEntry {
        StatusEntry {
            member_id: member_id.to_string(),
            is_in,
            started_at: if is_in { Some("2024-10-01T16:00:00.000Z".into()) } else { None },
            elapsed_sec: None,
        }
    }

    fn toggle(id: &str, member_id: &str, team_id: &str) -> PendingToggle {
        PendingToggle::new(id.to_string(), member_id, team_id, 1_727_798_400_000)
    }

    #[test]
    fn test_optimistic_toggle_flips_and_marks_slot() {
        let mut board = StatusBoard::from_snapshot(vec![entry("M1", false)]);
        board.apply_optimistic_toggle(&toggle("t1", "M1", "GP"));

        assert!(board.is_in("M1"));
        assert!(board.is_optimistic("M1"));
        assert_eq!(board.started_at("M1"), Some("2024-10-01T16:00:00.000Z"));
    }

    #[test]
    fn test_unknown_member_toggles_in() {
        let mut board = StatusBoard::new();
        board.apply_optimistic_toggle(&toggle("t1", "M7", "GP"));
        assert!(board.is_in("M7"));
        assert_eq!(board.clocked_in_count(), 1);
    }

    #[test]
    fn test_reconcile_replays_pending_for_team_only() {
        let pending = vec![
            toggle("t1", "M1", "GP"),
            toggle("t2", "M2", "BH"),
            toggle("t3", "M1", "GP"),
            toggle("t4", "M3", "GP"),
        ];
        let snapshot = vec![entry("M1", true), entry("M2", false), entry("M3", false)];
        let board = StatusBoard::reconcile(snapshot, &pending, "GP");

        // M1: dos toggles pendientes -> paridad par, sigue dentro pero optimista
        assert!(board.is_in("M1"));
        assert!(board.is_optimistic("M1"));
        // M2 es de otro equipo: se confía en el servidor
        assert!(!board.is_in("M2"));
        assert!(!board.is_optimistic("M2"));
        assert!(board.is_in("M3"));
    }

    #[test]
    fn test_settle_drains_pending_but_never_confirms() {
        let mut board = StatusBoard::new();
        board.apply_optimistic_toggle(&toggle("t1", "M1", "GP"));
        board.apply_optimistic_toggle(&toggle("t2", "M1", "GP"));

        board.settle("t1");
        assert_eq!(board.pending_count("M1"), 1);

        board.settle("t2");
        assert_eq!(board.pending_count("M1"), 0);
        assert!(board.is_optimistic("M1"));

        // ids desconocidos no hacen nada
        board.settle("nope");
        assert_eq!(board.len(), 1);
    }

    #[test]
    fn test_replayed_head_is_only_confirmed_by_fresh_snapshot() {
        // El servidor ya aplicó t1 (M1 dentro) pero t1 sigue en cola: el replay
        // lo invierte otra vez y el tablero muestra a M1 fuera.
        let pending = vec![toggle("t1", "M1", "GP")];
        let mut board = StatusBoard::reconcile(vec![entry("M1", true)], &pending, "GP");
        assert!(!board.is_in("M1"));

        board.settle("t1");
        assert!(board.is_optimistic("M1"));
        assert!(!matches!(board.slot("M1"), Some(StatusSlot::Confirmed(_))));

        // El refresco posterior al flush trae la verdad del servidor
        let board = StatusBoard::reconcile(vec![entry("M1", true)], &[], "GP");
        assert!(board.is_in("M1"));
        assert_eq!(board.slot("M1"), Some(&StatusSlot::Confirmed(entry("M1", true))));
    }
}
