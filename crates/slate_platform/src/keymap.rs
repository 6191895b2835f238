//! winit events to engine events.

use slate_core::input::Key;
use slate_core::lifecycle::SurfaceEvent;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

pub fn map_key(key_code: KeyCode) -> Option<Key> {
    match key_code {
        KeyCode::ArrowLeft => Some(Key::Left),
        KeyCode::ArrowRight => Some(Key::Right),
        KeyCode::ArrowUp => Some(Key::Up),
        KeyCode::ArrowDown => Some(Key::Down),
        KeyCode::Escape => Some(Key::Escape),
        KeyCode::F3 => Some(Key::F3),
        _ => None,
    }
}

pub fn key_event(key_code: KeyCode, state: ElementState) -> Option<SurfaceEvent> {
    let key = map_key(key_code)?;
    Some(match state {
        ElementState::Pressed => SurfaceEvent::KeyDown(key),
        ElementState::Released => SurfaceEvent::KeyUp(key),
    })
}

/// The engine event for `event`, if the engine cares about it. Zero-sized
/// resizes (minimised windows) are dropped.
pub fn translate_window_event(event: &WindowEvent) -> Option<SurfaceEvent> {
    match event {
        WindowEvent::CloseRequested => Some(SurfaceEvent::CloseRequested),
        WindowEvent::Resized(size) if size.width > 0 && size.height > 0 => {
            Some(SurfaceEvent::Resized {
                width: size.width,
                height: size.height,
            })
        }
        WindowEvent::KeyboardInput { event, .. } => match event.physical_key {
            PhysicalKey::Code(code) => key_event(code, event.state),
            PhysicalKey::Unidentified(_) => None,
        },
        _ => None,
    }
}
