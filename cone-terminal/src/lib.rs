/// Terminal host for the cone engine
use cone_core::{
    ConeRenderer, DeviceOrientation, EngineConfig, EngineError, GpuContext, RenderingEngine,
};
use crossterm::{
    cursor,
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, MouseButton,
        MouseEvent, MouseEventKind,
    },
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self},
};
use log::debug;
use nalgebra::Point2;
use std::io::{self, stdout, Stdout, Write};
use std::time::{Duration, Instant};

pub mod renderer;

pub use renderer::AsciiRenderer;

/// Terminal cells are roughly twice as tall as they are wide; finger
/// positions are reported in half-cell rows so angles look right on screen.
const CELL_ASPECT: i32 = 2;

/// Translate a terminal cell into the engine's pixel coordinates
pub fn cell_to_pixel(column: u16, row: u16) -> Point2<i32> {
    Point2::new(column as i32, row as i32 * CELL_ASPECT)
}

/// Orientation bound to a number key, if any
pub fn orientation_for_key(key: char) -> Option<DeviceOrientation> {
    let code = key.to_digit(10)?;
    DeviceOrientation::try_from(code).ok()
}

fn engine_error(error: EngineError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, error)
}

/// Main application struct for terminal cone rendering
pub struct TerminalApp {
    engine: ConeRenderer<AsciiRenderer<Stdout>>,
    running: bool,
    finger: Option<Point2<i32>>,
    orientation: DeviceOrientation,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(config: EngineConfig) -> io::Result<Self> {
        let (width, height) = terminal::size()?;

        let mut engine =
            ConeRenderer::new(AsciiRenderer::new(stdout()), config).map_err(engine_error)?;
        engine
            .initialize(width as u32, height as u32 * CELL_ASPECT as u32)
            .map_err(engine_error)?;
        // Rasterize into cells, not half-cell rows
        engine
            .context_mut()
            .configure_viewport(width as u32, height as u32)
            .map_err(|e| engine_error(e.into()))?;

        Ok(Self {
            engine,
            running: true,
            finger: None,
            orientation: DeviceOrientation::Portrait,
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        })
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            stdout(),
            terminal::EnterAlternateScreen,
            EnableMouseCapture,
            cursor::Hide
        )?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(
            stdout(),
            DisableMouseCapture,
            terminal::LeaveAlternateScreen,
            cursor::Show
        )?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target
        let mut previous = Instant::now();

        while self.running {
            let frame_start = Instant::now();

            // Drain pending input before drawing
            while event::poll(Duration::from_millis(0))? {
                self.handle_input(event::read()?);
            }

            // Update
            self.engine
                .update_animation((frame_start - previous).as_secs_f32());
            previous = frame_start;

            // Render
            self.render()?;

            // Frame timing
            self.frame_count += 1;
            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }

            // Update FPS counter
            let now = Instant::now();
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn handle_input(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent { code, .. }) => match code {
                KeyCode::Char('q') | KeyCode::Esc => {
                    self.running = false;
                }
                KeyCode::Char(key) => {
                    if let Some(orientation) = orientation_for_key(key) {
                        debug!("orientation changed to {:?}", orientation);
                        self.orientation = orientation;
                        self.engine.on_rotate(orientation);
                    }
                }
                _ => {}
            },
            Event::Mouse(MouseEvent {
                kind, column, row, ..
            }) => {
                let location = cell_to_pixel(column, row);
                match kind {
                    MouseEventKind::Down(MouseButton::Left) => {
                        self.engine.on_finger_down(location);
                        self.finger = Some(location);
                    }
                    MouseEventKind::Drag(MouseButton::Left) => {
                        let previous = self.finger.unwrap_or(location);
                        self.engine.on_finger_move(previous, location);
                        self.finger = Some(location);
                    }
                    MouseEventKind::Up(MouseButton::Left) => {
                        self.engine.on_finger_up(location);
                        self.finger = None;
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    fn render(&mut self) -> io::Result<()> {
        self.engine.render().map_err(engine_error)?;

        // Draw UI overlay
        let interaction = *self.engine.interaction();
        let orientation = self.engine.orientation();
        let status = format!(
            "Cone | FPS: {:.1} | angle {:>7.1} scale {:.1} | {:?} ({:.0} deg) | Drag=Rotate 0-6=Orientation Q=Quit",
            self.fps,
            interaction.rotation_angle,
            interaction.scale,
            self.orientation,
            orientation.angle().to_degrees(),
        );

        let stdout = self.engine.context_mut().output_mut();
        queue!(
            stdout,
            cursor::MoveTo(0, 0),
            SetForegroundColor(Color::Yellow),
            Print(status),
            ResetColor
        )?;

        stdout.flush()?;
        Ok(())
    }
}
