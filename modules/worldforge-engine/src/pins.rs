//! Map pin interactions: add, edit, remove.
//!
//! The editor owns only interaction state; pin data lives in the document
//! and every successful mutation flows through the session's dirty path.

use std::collections::HashSet;

use uuid::Uuid;

use worldforge_common::{MapPin, PinType};

use crate::mirror::KvStore;
use crate::session::WorldSession;

/// Pin interaction tools. Mutually exclusive; selecting the active tool
/// again switches back to neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinTool {
    Add,
    Edit,
    Remove,
}

/// Displayed dimensions of the map surface, in pixels.
#[derive(Debug, Clone, Copy)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

/// Pointer position converted into the document's percent coordinate
/// space (0–100 of the displayed map size).
pub fn to_percent(x: f64, y: f64, surface: SurfaceSize) -> Option<(f64, f64)> {
    if surface.width <= 0.0 || surface.height <= 0.0 {
        return None;
    }
    Some((
        (x / surface.width * 100.0).clamp(0.0, 100.0),
        (y / surface.height * 100.0).clamp(0.0, 100.0),
    ))
}

/// Form contents for a pin being placed or edited.
#[derive(Debug, Clone, PartialEq)]
pub struct PinDraft {
    pub name: String,
    pub kind: PinType,
    pub note: Option<String>,
}

impl Default for PinDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: PinType::Landmark,
            note: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Pending {
    New { x: f64, y: f64 },
    Existing { id: String },
}

/// What a click on the map surface produced.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    Ignored,
    /// A form opened: blank for a new placement, pre-filled when editing.
    FormOpened(PinDraft),
    /// Removal wants confirmation; nothing has mutated yet.
    RemovalRequested { id: String, name: String },
}

/// One marker per visible pin, rebuilt from scratch on every render.
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub id: String,
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub icon: &'static str,
}

pub const GENERIC_ICON: &str = "icon-marker";

/// Fixed type→icon lookup. Unrecognized types get the generic marker.
pub fn icon_for(kind: PinType) -> &'static str {
    match kind {
        PinType::Capital => "icon-crown",
        PinType::City => "icon-city",
        PinType::Town => "icon-town",
        PinType::Village => "icon-village",
        PinType::Harbor => "icon-anchor",
        PinType::Fort => "icon-fort",
        PinType::Ruin => "icon-ruin",
        PinType::Dungeon => "icon-dungeon",
        PinType::Landmark => "icon-landmark",
        PinType::Camp => "icon-camp",
        PinType::Other => GENERIC_ICON,
    }
}

/// Click-to-pin hit radius, in percent of map size.
const HIT_RADIUS_PCT: f64 = 2.5;

#[derive(Debug, Default)]
pub struct MapEditor {
    tool: Option<PinTool>,
    pending: Option<Pending>,
    hidden: HashSet<PinType>,
    generation: u64,
}

impl MapEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tool(&self) -> Option<PinTool> {
        self.tool
    }

    /// Select a tool; re-selecting the active one turns it off. Any
    /// half-open form is discarded without mutating the document.
    pub fn toggle_tool(&mut self, tool: PinTool) {
        self.pending = None;
        self.tool = if self.tool == Some(tool) {
            None
        } else {
            Some(tool)
        };
    }

    /// Floating preview marker while placing. Only meaningful in add mode
    /// with no form open.
    pub fn hover_preview(&self, x: f64, y: f64, surface: SurfaceSize) -> Option<(f64, f64)> {
        if self.tool != Some(PinTool::Add) || self.pending.is_some() {
            return None;
        }
        to_percent(x, y, surface)
    }

    pub fn click<S: KvStore>(
        &mut self,
        session: &WorldSession<S>,
        x: f64,
        y: f64,
        surface: SurfaceSize,
    ) -> ClickOutcome {
        if self.pending.is_some() {
            return ClickOutcome::Ignored;
        }
        let Some((px, py)) = to_percent(x, y, surface) else {
            return ClickOutcome::Ignored;
        };

        match self.tool {
            None => ClickOutcome::Ignored,
            Some(PinTool::Add) => {
                self.pending = Some(Pending::New { x: px, y: py });
                ClickOutcome::FormOpened(PinDraft::default())
            }
            Some(PinTool::Edit) => match hit_test(&session.world().map_pins, px, py) {
                Some(pin) => {
                    let draft = PinDraft {
                        name: pin.name.clone(),
                        kind: pin.kind,
                        note: pin.note.clone(),
                    };
                    self.pending = Some(Pending::Existing { id: pin.id.clone() });
                    ClickOutcome::FormOpened(draft)
                }
                None => ClickOutcome::Ignored,
            },
            Some(PinTool::Remove) => match hit_test(&session.world().map_pins, px, py) {
                Some(pin) => ClickOutcome::RemovalRequested {
                    id: pin.id.clone(),
                    name: pin.name.clone(),
                },
                None => ClickOutcome::Ignored,
            },
        }
    }

    /// Confirm the open form. A new placement appends a pin with a fresh
    /// id and resets the tool to neutral; an edit replaces the matched
    /// pin's fields in place. Returns the affected pin's id.
    pub fn confirm_form<S: KvStore>(
        &mut self,
        session: &mut WorldSession<S>,
        draft: PinDraft,
    ) -> Option<String> {
        match self.pending.take()? {
            Pending::New { x, y } => {
                let id = Uuid::new_v4().to_string();
                session.push_map_pin(MapPin {
                    id: id.clone(),
                    name: draft.name,
                    kind: draft.kind,
                    note: draft.note,
                    x,
                    y,
                });
                self.tool = None;
                self.generation += 1;
                Some(id)
            }
            Pending::Existing { id } => {
                if session.update_map_pin(&id, draft.name, draft.kind, draft.note) {
                    self.generation += 1;
                    Some(id)
                } else {
                    None
                }
            }
        }
    }

    /// Close the form without confirming: the pending pin is discarded
    /// and the document is not touched.
    pub fn cancel_form(&mut self) {
        self.pending = None;
    }

    pub fn confirm_remove<S: KvStore>(
        &mut self,
        session: &mut WorldSession<S>,
        id: &str,
    ) -> bool {
        let removed = session.remove_map_pin(id);
        if removed {
            self.generation += 1;
        }
        removed
    }

    /// Per-type layer visibility. Presentation only: the stored pins are
    /// never touched.
    pub fn set_layer_visible(&mut self, kind: PinType, visible: bool) {
        if visible {
            self.hidden.remove(&kind);
        } else {
            self.hidden.insert(kind);
        }
    }

    /// Bumped on every successful pin mutation; the presentation layer
    /// re-renders when it changes.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Clear-and-redraw: a fresh marker list, one per visible pin.
    pub fn render<S: KvStore>(&self, session: &WorldSession<S>) -> Vec<Marker> {
        session
            .world()
            .map_pins
            .iter()
            .filter(|pin| !self.hidden.contains(&pin.kind))
            .map(|pin| Marker {
                id: pin.id.clone(),
                name: pin.name.clone(),
                x: pin.x,
                y: pin.y,
                icon: icon_for(pin.kind),
            })
            .collect()
    }
}

/// Closest pin within the hit radius, if any.
fn hit_test(pins: &[MapPin], px: f64, py: f64) -> Option<&MapPin> {
    pins.iter()
        .map(|pin| {
            let dx = pin.x - px;
            let dy = pin.y - py;
            (pin, (dx * dx + dy * dy).sqrt())
        })
        .filter(|(_, dist)| *dist <= HIT_RADIUS_PCT)
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(pin, _)| pin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mirror::{MemoryStore, Mirror};
    use crate::session::SessionConfig;

    fn test_session() -> WorldSession<MemoryStore> {
        let config = SessionConfig {
            max_document_bytes: 3 * 1024 * 1024,
            max_raster_bytes: 3 * 1024 * 1024,
            export_dir: std::env::temp_dir(),
        };
        WorldSession::create("Eldoria", Mirror::new(MemoryStore::new()), config)
    }

    const SURFACE: SurfaceSize = SurfaceSize {
        width: 1000.0,
        height: 800.0,
    };

    #[test]
    fn percent_conversion_clamps() {
        assert_eq!(to_percent(500.0, 400.0, SURFACE), Some((50.0, 50.0)));
        assert_eq!(to_percent(-20.0, 900.0, SURFACE), Some((0.0, 100.0)));
        assert_eq!(
            to_percent(
                10.0,
                10.0,
                SurfaceSize {
                    width: 0.0,
                    height: 10.0
                }
            ),
            None
        );
    }

    #[test]
    fn toggling_the_active_tool_turns_it_off() {
        let mut editor = MapEditor::new();
        editor.toggle_tool(PinTool::Add);
        assert_eq!(editor.tool(), Some(PinTool::Add));
        editor.toggle_tool(PinTool::Remove);
        assert_eq!(editor.tool(), Some(PinTool::Remove));
        editor.toggle_tool(PinTool::Remove);
        assert_eq!(editor.tool(), None);
    }

    #[test]
    fn add_flow_appends_one_pin_and_resets_tool() {
        let mut session = test_session();
        let mut editor = MapEditor::new();
        editor.toggle_tool(PinTool::Add);

        assert!(editor.hover_preview(500.0, 400.0, SURFACE).is_some());

        let outcome = editor.click(&session, 500.0, 400.0, SURFACE);
        assert!(matches!(outcome, ClickOutcome::FormOpened(_)));

        let id = editor
            .confirm_form(
                &mut session,
                PinDraft {
                    name: "Port Talon".to_string(),
                    kind: PinType::Harbor,
                    note: None,
                },
            )
            .expect("pin appended");

        assert_eq!(editor.tool(), None);
        let pins = &session.world().map_pins;
        assert_eq!(pins.len(), 1);
        assert_eq!(pins[0].id, id);
        assert_eq!(pins[0].kind, PinType::Harbor);
        assert_eq!((pins[0].x, pins[0].y), (50.0, 50.0));
        assert!(session.is_dirty());

        assert!(editor.confirm_remove(&mut session, &id));
        assert!(session.world().map_pins.is_empty());
    }

    #[test]
    fn cancel_discards_the_pending_pin() {
        let mut session = test_session();
        let mut editor = MapEditor::new();
        editor.toggle_tool(PinTool::Add);
        editor.click(&session, 500.0, 400.0, SURFACE);
        editor.cancel_form();

        assert!(session.world().map_pins.is_empty());
        assert!(editor.confirm_form(&mut session, PinDraft::default()).is_none());
    }

    #[test]
    fn edit_replaces_fields_in_place() {
        let mut session = test_session();
        let mut editor = MapEditor::new();

        editor.toggle_tool(PinTool::Add);
        editor.click(&session, 500.0, 400.0, SURFACE);
        let id = editor
            .confirm_form(
                &mut session,
                PinDraft {
                    name: "Port Talon".to_string(),
                    kind: PinType::Harbor,
                    note: None,
                },
            )
            .unwrap();

        editor.toggle_tool(PinTool::Edit);
        let outcome = editor.click(&session, 500.0, 400.0, SURFACE);
        match outcome {
            ClickOutcome::FormOpened(draft) => {
                assert_eq!(draft.name, "Port Talon");
                assert_eq!(draft.kind, PinType::Harbor);
            }
            other => panic!("expected a pre-filled form, got {other:?}"),
        }

        editor
            .confirm_form(
                &mut session,
                PinDraft {
                    name: "Talon Rock".to_string(),
                    kind: PinType::Fort,
                    note: Some("garrisoned".to_string()),
                },
            )
            .unwrap();

        let pin = &session.world().map_pins[0];
        assert_eq!(pin.id, id);
        assert_eq!(pin.name, "Talon Rock");
        assert_eq!(pin.kind, PinType::Fort);
        assert_eq!((pin.x, pin.y), (50.0, 50.0));
    }

    #[test]
    fn clicks_away_from_pins_are_ignored() {
        let mut session = test_session();
        let mut editor = MapEditor::new();

        editor.toggle_tool(PinTool::Add);
        editor.click(&session, 500.0, 400.0, SURFACE);
        editor.confirm_form(
            &mut session,
            PinDraft {
                name: "Port Talon".to_string(),
                kind: PinType::Harbor,
                note: None,
            },
        );

        editor.toggle_tool(PinTool::Remove);
        assert_eq!(
            editor.click(&session, 10.0, 10.0, SURFACE),
            ClickOutcome::Ignored
        );
        assert_eq!(session.world().map_pins.len(), 1);
    }

    #[test]
    fn hidden_layers_filter_render_but_not_storage() {
        let mut session = test_session();
        let mut editor = MapEditor::new();

        for (name, kind, x) in [
            ("Port Talon", PinType::Harbor, 100.0),
            ("Kestrel Keep", PinType::Fort, 500.0),
        ] {
            editor.toggle_tool(PinTool::Add);
            editor.click(&session, x, 400.0, SURFACE);
            editor.confirm_form(
                &mut session,
                PinDraft {
                    name: name.to_string(),
                    kind,
                    note: None,
                },
            );
        }

        editor.set_layer_visible(PinType::Harbor, false);
        let markers = editor.render(&session);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].name, "Kestrel Keep");
        assert_eq!(session.world().map_pins.len(), 2);

        editor.set_layer_visible(PinType::Harbor, true);
        assert_eq!(editor.render(&session).len(), 2);
    }

    #[test]
    fn unknown_type_renders_the_generic_marker() {
        assert_eq!(icon_for(PinType::from_name("Volcano")), GENERIC_ICON);
        assert_eq!(icon_for(PinType::Harbor), "icon-anchor");
    }
}
