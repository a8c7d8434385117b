use std::time::Instant;

use anyhow::Result;
use curveq_core::engine::AudioEngineHandle;
use ratatui::{
    Frame,
    crossterm::event::{KeyCode, MouseEvent},
    layout::Rect,
};

use crate::{
    routes::{bands::BandsRoute, curve::CurveRoute, log::LogRoute, settings::SettingsRoute},
    state::AppState,
};

/// Trait that all routes must implement
pub trait RouteHandler: std::fmt::Debug {
    /// Render this route's UI
    fn render(&self, frame: &mut Frame, area: Rect, state: &AppState);

    /// Handle keyboard input for this route
    fn handle_input(
        &mut self,
        key: KeyCode,
        state: &mut AppState,
        handle: &AudioEngineHandle,
    ) -> Result<RouteAction>;

    /// Mouse input, with the time it arrived
    fn handle_mouse(
        &mut self,
        _mouse: MouseEvent,
        _state: &mut AppState,
        _now: Instant,
    ) -> Result<RouteAction> {
        Ok(RouteAction::None)
    }

    /// Get the display name for the tab bar
    fn name(&self) -> &str;

    /// Optional: Called when entering this route
    fn on_enter(&mut self, _state: &mut AppState) -> Result<()> {
        Ok(())
    }

    /// Optional: Called when leaving this route
    fn on_exit(&mut self, _state: &mut AppState) -> Result<()> {
        Ok(())
    }

    fn help_items(&self, _state: &AppState) -> Vec<(&str, &str)> {
        vec![("Tab", "Switch Tab"), ("Q", "Quit")]
    }
}

/// Actions that can be returned from route handlers
#[derive(Debug)]
pub enum RouteAction {
    /// Do nothing, stay on current route
    None,
    /// Replace current route with a new one
    Replace(Box<dyn RouteHandler>),
    /// Quit the application
    Quit,
}

/// Router owns the route currently on screen
pub struct Router {
    current: Box<dyn RouteHandler>,
}

impl Router {
    pub fn new(initial_route: Box<dyn RouteHandler>) -> Self {
        Self {
            current: initial_route,
        }
    }

    pub fn current(&self) -> &dyn RouteHandler {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> &mut Box<dyn RouteHandler> {
        &mut self.current
    }

    /// Execute a route action. Returns true when the app should quit.
    pub fn execute_action(&mut self, action: RouteAction, state: &mut AppState) -> Result<bool> {
        match action {
            RouteAction::None => Ok(false),
            RouteAction::Replace(route) => {
                self.replace(route, state)?;
                Ok(false)
            }
            RouteAction::Quit => Ok(true),
        }
    }

    /// Swap the current route (tab switching)
    pub fn replace(&mut self, mut new_route: Box<dyn RouteHandler>, state: &mut AppState) -> Result<()> {
        self.current.on_exit(state)?;
        new_route.on_enter(state)?;
        log::debug!("route {} -> {}", self.current.name(), new_route.name());
        self.current = new_route;
        Ok(())
    }
}

/// Get a route handler for a given tab name
pub fn route_for_name(name: &str) -> Box<dyn RouteHandler> {
    match name {
        "Curve" => Box::new(CurveRoute::new()),
        "Bands" => Box::new(BandsRoute::new()),
        "Settings" => Box::new(SettingsRoute),
        "Log" => Box::new(LogRoute),
        _ => Box::new(CurveRoute::new()),
    }
}

/// Get all main tab names in order
pub fn tab_names() -> &'static [&'static str] {
    &["Curve", "Bands", "Settings", "Log"]
}

/// The tab after `current`, wrapping around
pub fn next_tab(current: &str) -> Box<dyn RouteHandler> {
    let tabs = tab_names();
    let index = tabs.iter().position(|n| *n == current).unwrap_or(0);
    route_for_name(tabs[(index + 1) % tabs.len()])
}

#[cfg(test)]
mod tests {
    use curveq_core::CurveConfig;

    use super::*;

    #[test]
    fn tabs_cycle_in_order() {
        let mut names = vec![];
        let mut route = route_for_name("Curve");
        for _ in 0..5 {
            route = next_tab(route.name());
            names.push(route.name().to_string());
        }
        assert_eq!(names, ["Bands", "Settings", "Log", "Curve", "Bands"]);
    }

    #[test]
    fn actions_switch_routes_and_quit() {
        let mut state = AppState::new(CurveConfig::default());
        let mut router = Router::new(route_for_name("Curve"));

        assert!(!router.execute_action(RouteAction::None, &mut state).unwrap());
        assert_eq!(router.current().name(), "Curve");

        let next = RouteAction::Replace(next_tab(router.current().name()));
        assert!(!router.execute_action(next, &mut state).unwrap());
        assert_eq!(router.current().name(), "Bands");

        assert!(router.execute_action(RouteAction::Quit, &mut state).unwrap());
    }
}
