/// Cone wgpu Demo - Touch-rotatable cone in a window
///
/// Usage: cone-wgpu [slices]
///
/// Controls:
///   - Mouse drag / touch: Point the cone at the finger (enlarged while held)
///   - 0-6: Device orientation (unknown, portrait, upside-down,
///          landscape left/right, face up/down)
///   - ESC: Quit

use cone_core::{create_renderer, EngineConfig, EngineError, GpuError, RenderingEngine};
use cone_wgpu::input::orientation_for_key;
use cone_wgpu::{FingerTracker, WgpuContext};
use log::{error, info, warn};
use std::env;
use std::error::Error;
use std::sync::Arc;
use std::time::Instant;
use winit::{
    dpi::LogicalSize,
    event::{ElementState, Event, KeyEvent, MouseButton, WindowEvent},
    event_loop::EventLoop,
    keyboard::{Key, NamedKey},
    window::WindowBuilder,
};

fn config_from_args() -> Result<EngineConfig, Box<dyn Error>> {
    let mut config = EngineConfig::default();
    if let Some(arg) = env::args().nth(1) {
        config.cone.slices = arg
            .parse()
            .map_err(|e| format!("Invalid slice count '{}': {}", arg, e))?;
    }
    Ok(config)
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config_from_args()?;

    let event_loop = EventLoop::new()?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("Cone")
            .with_inner_size(LogicalSize::new(320.0, 480.0))
            .build(&event_loop)?,
    );

    let context = pollster::block_on(WgpuContext::new(Arc::clone(&window)))?;
    let mut engine = create_renderer(context, config)?;

    let size = window.inner_size();
    engine.initialize(size.width, size.height)?;
    info!("rendering {} slices", config.cone.slices);

    let mut fingers = FingerTracker::default();
    let mut last_frame = Instant::now();

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { event, .. } => match event {
            WindowEvent::CloseRequested => elwt.exit(),
            WindowEvent::Resized(size) => {
                // The pivot and render targets depend on the viewport
                if let Err(e) = engine.initialize(size.width, size.height) {
                    error!("re-initialization failed: {}", e);
                    elwt.exit();
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(finger) = fingers.cursor_moved(position.x, position.y) {
                    finger.dispatch(engine.as_mut());
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let finger = match state {
                    ElementState::Pressed => fingers.pressed(),
                    ElementState::Released => fingers.released(),
                };
                if let Some(finger) = finger {
                    finger.dispatch(engine.as_mut());
                }
            }
            WindowEvent::Touch(touch) => {
                for finger in fingers.touched(touch.phase, touch.location.x, touch.location.y) {
                    finger.dispatch(engine.as_mut());
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        logical_key,
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => match logical_key {
                Key::Named(NamedKey::Escape) => elwt.exit(),
                Key::Character(key) => {
                    if let Some(orientation) = orientation_for_key(key.as_str()) {
                        info!("orientation changed to {:?}", orientation);
                        engine.on_rotate(orientation);
                    }
                }
                _ => {}
            },
            WindowEvent::RedrawRequested => {
                let now = Instant::now();
                engine.update_animation((now - last_frame).as_secs_f32());
                last_frame = now;

                match engine.render() {
                    Ok(()) => {}
                    Err(EngineError::Gpu(GpuError::SurfaceLost)) => {
                        warn!("surface lost; retrying next frame");
                    }
                    Err(e) => {
                        error!("render failed: {}", e);
                        elwt.exit();
                    }
                }
            }
            _ => {}
        },
        Event::AboutToWait => window.request_redraw(),
        _ => {}
    })?;

    Ok(())
}
