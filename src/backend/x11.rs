//! X11 window system backend using x11rb and EWMH hints

use x11rb::connection::Connection;
use x11rb::errors::ReplyError;
use x11rb::protocol::ErrorKind;
use x11rb::protocol::randr::ConnectionExt as _;
use x11rb::protocol::xproto::{self, Atom, AtomEnum, ConnectionExt, Window};
use x11rb::rust_connection::RustConnection;

use super::{BackendError, WindowSystem};
use crate::core::types::{BoundsChange, ShowState, WindowGeometry, WindowHandle, WindowRecord};

/// `_NET_WM_STATE` client message action
const NET_WM_STATE_REMOVE: u32 = 0;

/// Source indication for client messages: 1 = application
const SOURCE_APPLICATION: u32 = 1;

/// X11 window backend
pub struct X11Backend {
    conn: RustConnection,
    root: Window,
    screen_size: (u16, u16),
    atoms: X11Atoms,
}

/// Cached X11 atoms for efficiency
struct X11Atoms {
    net_client_list: Atom,
    net_wm_name: Atom,
    net_wm_pid: Atom,
    wm_name: Atom,
    utf8_string: Atom,
    net_wm_state: Atom,
    net_wm_state_hidden: Atom,
    net_wm_state_maximized_vert: Atom,
    net_wm_state_maximized_horz: Atom,
    net_wm_state_skip_taskbar: Atom,
    net_wm_window_type: Atom,
    /// Window types that never represent an application's main surface
    tool_window_types: Vec<Atom>,
}

const TOOL_WINDOW_TYPES: &[&[u8]] = &[
    b"_NET_WM_WINDOW_TYPE_DESKTOP",
    b"_NET_WM_WINDOW_TYPE_DOCK",
    b"_NET_WM_WINDOW_TYPE_TOOLBAR",
    b"_NET_WM_WINDOW_TYPE_MENU",
    b"_NET_WM_WINDOW_TYPE_UTILITY",
    b"_NET_WM_WINDOW_TYPE_SPLASH",
    b"_NET_WM_WINDOW_TYPE_DROPDOWN_MENU",
    b"_NET_WM_WINDOW_TYPE_POPUP_MENU",
    b"_NET_WM_WINDOW_TYPE_TOOLTIP",
    b"_NET_WM_WINDOW_TYPE_NOTIFICATION",
    b"_NET_WM_WINDOW_TYPE_COMBO",
    b"_NET_WM_WINDOW_TYPE_DND",
];

impl X11Backend {
    /// Create a new X11 backend
    pub fn new() -> anyhow::Result<Self> {
        let (conn, screen_num) = RustConnection::connect(None)?;
        let screen = &conn.setup().roots[screen_num];
        let root = screen.root;
        let screen_size = (screen.width_in_pixels, screen.height_in_pixels);

        // Intern atoms we need
        let atoms = Self::intern_atoms(&conn)?;

        Ok(Self {
            conn,
            root,
            screen_size,
            atoms,
        })
    }

    fn intern(conn: &RustConnection, name: &[u8]) -> anyhow::Result<Atom> {
        Ok(conn.intern_atom(false, name)?.reply()?.atom)
    }

    fn intern_atoms(conn: &RustConnection) -> anyhow::Result<X11Atoms> {
        let tool_window_types = TOOL_WINDOW_TYPES
            .iter()
            .map(|name| Self::intern(conn, name))
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(X11Atoms {
            net_client_list: Self::intern(conn, b"_NET_CLIENT_LIST")?,
            net_wm_name: Self::intern(conn, b"_NET_WM_NAME")?,
            net_wm_pid: Self::intern(conn, b"_NET_WM_PID")?,
            wm_name: Self::intern(conn, b"WM_NAME")?,
            utf8_string: Self::intern(conn, b"UTF8_STRING")?,
            net_wm_state: Self::intern(conn, b"_NET_WM_STATE")?,
            net_wm_state_hidden: Self::intern(conn, b"_NET_WM_STATE_HIDDEN")?,
            net_wm_state_maximized_vert: Self::intern(conn, b"_NET_WM_STATE_MAXIMIZED_VERT")?,
            net_wm_state_maximized_horz: Self::intern(conn, b"_NET_WM_STATE_MAXIMIZED_HORZ")?,
            net_wm_state_skip_taskbar: Self::intern(conn, b"_NET_WM_STATE_SKIP_TASKBAR")?,
            net_wm_window_type: Self::intern(conn, b"_NET_WM_WINDOW_TYPE")?,
            tool_window_types,
        })
    }

    fn get_window_property(
        &self,
        window: Window,
        property: Atom,
        type_: Atom,
    ) -> Result<Option<Vec<u8>>, ReplyError> {
        let reply = self
            .conn
            .get_property(false, window, property, type_, 0, u32::MAX)?
            .reply()?;

        if reply.value.is_empty() {
            Ok(None)
        } else {
            Ok(Some(reply.value))
        }
    }

    /// Read a list of 32-bit values (atoms, windows, cardinals)
    fn get_words(&self, window: Window, property: Atom, type_: Atom) -> Result<Vec<u32>, ReplyError> {
        Ok(self
            .get_window_property(window, property, type_)?
            .map(|data| words(&data))
            .unwrap_or_default())
    }

    fn get_window_title(&self, window: Window) -> Result<String, ReplyError> {
        // Try _NET_WM_NAME first (UTF-8)
        if let Some(data) = self.get_window_property(window, self.atoms.net_wm_name, self.atoms.utf8_string)? {
            if let Ok(s) = String::from_utf8(data) {
                return Ok(s);
            }
        }

        // Fall back to WM_NAME
        if let Some(data) = self.get_window_property(window, self.atoms.wm_name, AtomEnum::STRING.into())? {
            return Ok(String::from_utf8_lossy(&data).into_owned());
        }

        Ok(String::new())
    }

    fn get_window_geometry(&self, window: Window) -> Result<WindowGeometry, ReplyError> {
        let geom = self.conn.get_geometry(window)?.reply()?;

        // Translate to root window coordinates
        let translated = self.conn.translate_coordinates(window, self.root, 0, 0)?.reply()?;

        Ok(WindowGeometry {
            x: i32::from(translated.dst_x),
            y: i32::from(translated.dst_y),
            width: u32::from(geom.width),
            height: u32::from(geom.height),
        })
    }

    fn get_window_states(&self, window: Window) -> Result<Vec<Atom>, ReplyError> {
        self.get_words(window, self.atoms.net_wm_state, AtomEnum::ATOM.into())
    }

    fn is_viewable(&self, window: Window) -> Result<bool, ReplyError> {
        let attrs = self.conn.get_window_attributes(window)?.reply()?;
        Ok(attrs.map_state == xproto::MapState::VIEWABLE)
    }

    fn read_record(&self, window: Window) -> Result<Option<WindowRecord>, ReplyError> {
        let pid = match self
            .get_words(window, self.atoms.net_wm_pid, AtomEnum::CARDINAL.into())?
            .first()
        {
            Some(&pid) if pid != 0 => pid,
            _ => return Ok(None),
        };

        let states = self.get_window_states(window)?;
        let types = self.get_words(window, self.atoms.net_wm_window_type, AtomEnum::ATOM.into())?;
        let hidden = states.contains(&self.atoms.net_wm_state_hidden);

        Ok(Some(WindowRecord {
            handle: to_handle(window),
            pid,
            title: self.get_window_title(window)?,
            visible: !hidden && self.is_viewable(window)?,
            tool: is_tool_window(&types, &states, &self.atoms),
            bounds: self.get_window_geometry(window)?,
        }))
    }

    fn send_wm_state_removal(&self, window: Window, first: Atom, second: Atom) -> Result<(), ReplyError> {
        let event = xproto::ClientMessageEvent::new(
            32,
            window,
            self.atoms.net_wm_state,
            [NET_WM_STATE_REMOVE, first, second, SOURCE_APPLICATION, 0],
        );

        self.conn
            .send_event(
                false,
                self.root,
                xproto::EventMask::SUBSTRUCTURE_REDIRECT | xproto::EventMask::SUBSTRUCTURE_NOTIFY,
                event,
            )?
            .check()
    }
}

impl WindowSystem for X11Backend {
    fn name(&self) -> &'static str {
        "x11"
    }

    fn enumerate_windows(&self) -> Result<Vec<WindowRecord>, BackendError> {
        let clients = self
            .get_words(self.root, self.atoms.net_client_list, AtomEnum::WINDOW.into())
            .map_err(|e| BackendError::Os(format!("reading _NET_CLIENT_LIST: {e}")))?;

        let mut windows = Vec::with_capacity(clients.len());
        for window in clients {
            match self.read_record(window) {
                Ok(Some(record)) => windows.push(record),
                Ok(None) => tracing::trace!("Skipping window 0x{:X} without _NET_WM_PID", window),
                Err(e) => match map_reply_error(window, e) {
                    // Destroyed between listing and inspection
                    BackendError::WindowGone(_) => {
                        tracing::debug!("Window 0x{:X} vanished during enumeration", window);
                    }
                    other => return Err(other),
                },
            }
        }

        Ok(windows)
    }

    fn window_rect(&self, handle: WindowHandle) -> Result<WindowGeometry, BackendError> {
        let window = to_window(handle)?;
        self.get_window_geometry(window)
            .map_err(|e| map_reply_error(window, e))
    }

    fn show_state(&self, handle: WindowHandle) -> Result<ShowState, BackendError> {
        let window = to_window(handle)?;
        let states = self
            .get_window_states(window)
            .map_err(|e| map_reply_error(window, e))?;

        Ok(show_state_from(&states, &self.atoms))
    }

    fn restore(&self, handle: WindowHandle) -> Result<(), BackendError> {
        let window = to_window(handle)?;

        let restore = || -> Result<(), ReplyError> {
            // Mapping an iconic window is the ICCCM way to de-iconify it
            self.conn.map_window(window)?.check()?;
            self.send_wm_state_removal(
                window,
                self.atoms.net_wm_state_maximized_vert,
                self.atoms.net_wm_state_maximized_horz,
            )?;
            self.conn.flush()?;
            Ok(())
        };

        restore().map_err(|e| map_reply_error(window, e))
    }

    fn apply_bounds(&self, handle: WindowHandle, change: BoundsChange) -> Result<(), BackendError> {
        let window = to_window(handle)?;

        // One ConfigureWindow request carries origin and extent together
        let values = match change {
            BoundsChange::Resize { width, height } => {
                xproto::ConfigureWindowAux::new().width(width).height(height)
            }
            BoundsChange::MoveResize(rect) => xproto::ConfigureWindowAux::new()
                .x(rect.x)
                .y(rect.y)
                .width(rect.width)
                .height(rect.height),
        };

        let apply = || -> Result<(), ReplyError> {
            self.conn.configure_window(window, &values)?.check()?;
            self.conn.flush()?;
            Ok(())
        };

        apply().map_err(|e| map_reply_error(window, e))
    }

    fn monitors(&self) -> Result<Vec<WindowGeometry>, BackendError> {
        let reply = self
            .conn
            .randr_get_monitors(self.root, true)
            .map_err(ReplyError::from)
            .and_then(|cookie| cookie.reply());

        match reply {
            Ok(reply) if !reply.monitors.is_empty() => Ok(reply
                .monitors
                .iter()
                .map(|m| {
                    WindowGeometry::new(
                        i32::from(m.x),
                        i32::from(m.y),
                        u32::from(m.width),
                        u32::from(m.height),
                    )
                })
                .collect()),
            Ok(_) | Err(_) => {
                // No RandR: the root window spans the whole screen
                let (width, height) = self.screen_size;
                Ok(vec![WindowGeometry::new(0, 0, u32::from(width), u32::from(height))])
            }
        }
    }
}

fn to_handle(window: Window) -> WindowHandle {
    WindowHandle::from_raw(u64::from(window))
}

fn to_window(handle: WindowHandle) -> Result<Window, BackendError> {
    Window::try_from(handle.as_raw()).map_err(|_| BackendError::WindowGone(handle))
}

fn map_reply_error(window: Window, err: ReplyError) -> BackendError {
    match err {
        ReplyError::X11Error(e) => match e.error_kind {
            ErrorKind::Window | ErrorKind::Drawable => BackendError::WindowGone(to_handle(window)),
            ErrorKind::Access => {
                BackendError::AccessDenied(format!("X server refused request on window 0x{window:X}"))
            }
            ErrorKind::Alloc => BackendError::Transient(format!("X server out of resources: {e:?}")),
            _ => BackendError::Os(format!("X11 error: {e:?}")),
        },
        ReplyError::ConnectionError(e) => BackendError::Os(format!("X11 connection error: {e}")),
    }
}

/// Split a 32-bit format property value into native-endian words
fn words(data: &[u8]) -> Vec<u32> {
    data.chunks_exact(4)
        .map(|chunk| u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

fn is_tool_window(types: &[Atom], states: &[Atom], atoms: &X11Atoms) -> bool {
    states.contains(&atoms.net_wm_state_skip_taskbar)
        || types.iter().any(|t| atoms.tool_window_types.contains(t))
}

fn show_state_from(states: &[Atom], atoms: &X11Atoms) -> ShowState {
    if states.contains(&atoms.net_wm_state_hidden) {
        ShowState::Minimized
    } else if states.contains(&atoms.net_wm_state_maximized_vert)
        || states.contains(&atoms.net_wm_state_maximized_horz)
    {
        ShowState::Maximized
    } else {
        ShowState::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_atoms() -> X11Atoms {
        X11Atoms {
            net_client_list: 1,
            net_wm_name: 2,
            net_wm_pid: 3,
            wm_name: 4,
            utf8_string: 5,
            net_wm_state: 6,
            net_wm_state_hidden: 7,
            net_wm_state_maximized_vert: 8,
            net_wm_state_maximized_horz: 9,
            net_wm_state_skip_taskbar: 10,
            net_wm_window_type: 11,
            tool_window_types: vec![20, 21, 22],
        }
    }

    #[test]
    fn test_words_ignores_trailing_bytes() {
        let mut data = Vec::new();
        data.extend_from_slice(&7u32.to_ne_bytes());
        data.extend_from_slice(&0x3a00007u32.to_ne_bytes());
        data.push(0xff);
        assert_eq!(words(&data), vec![7, 0x3a00007]);
    }

    #[test]
    fn test_tool_window_by_type() {
        let atoms = fake_atoms();
        assert!(is_tool_window(&[21], &[], &atoms));
        // _NET_WM_WINDOW_TYPE_NORMAL is not in the tool set
        assert!(!is_tool_window(&[99], &[], &atoms));
        assert!(!is_tool_window(&[], &[], &atoms));
    }

    #[test]
    fn test_skip_taskbar_marks_tool_window() {
        let atoms = fake_atoms();
        assert!(is_tool_window(&[], &[10], &atoms));
    }

    #[test]
    fn test_show_state_hidden_wins_over_maximized() {
        let atoms = fake_atoms();
        assert_eq!(show_state_from(&[8, 9, 7], &atoms), ShowState::Minimized);
        assert_eq!(show_state_from(&[8, 9], &atoms), ShowState::Maximized);
        assert_eq!(show_state_from(&[9], &atoms), ShowState::Maximized);
        assert_eq!(show_state_from(&[10], &atoms), ShowState::Normal);
    }

    #[test]
    fn test_handle_window_conversion() {
        let handle = to_handle(0x3a00007);
        assert_eq!(to_window(handle), Ok(0x3a00007));
        assert_eq!(
            to_window(WindowHandle::from_raw(u64::MAX)),
            Err(BackendError::WindowGone(WindowHandle::from_raw(u64::MAX)))
        );
    }
}
