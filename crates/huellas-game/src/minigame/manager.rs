use std::cell::RefCell;
use std::rc::Rc;

use huellas_core::{EventBus, SubscriptionId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MinigameConfig {
    /// Points needed to win a round
    pub win_score: i32,
    /// Round length in seconds
    pub game_time: f32,
    /// Rounds before the game is over (0 = unlimited)
    pub max_rounds: u32,
}

impl Default for MinigameConfig {
    fn default() -> Self {
        Self {
            win_score: 50,
            game_time: 60.0,
            max_rounds: 3,
        }
    }
}

/// Round, score and timer bookkeeping of the minigame.
pub struct MinigameManager {
    config: MinigameConfig,
    events: Rc<EventBus>,
    score: i32,
    time_left: f32,
    round: u32,
    active: bool,
    game_over: bool,
    last_result: Option<bool>,
}

impl MinigameManager {
    pub fn new(config: MinigameConfig, events: Rc<EventBus>) -> Self {
        Self {
            config,
            events,
            score: 0,
            time_left: config.game_time,
            round: 0,
            active: false,
            game_over: false,
            last_result: None,
        }
    }

    /// Start the next round. Returns false if a round is running or the game is over.
    pub fn start_game(&mut self) -> bool {
        if self.active {
            warn!("[Minigame] Game already running!");
            return false;
        }
        if self.game_over {
            warn!("[Minigame] Game over, reset before starting again");
            return false;
        }

        self.round += 1;
        self.active = true;
        self.time_left = self.config.game_time;
        self.score = 0;

        info!("[Minigame] Round {} started!", self.round);
        self.events.minigame_started.publish(&());
        true
    }

    pub fn add_score(&mut self, points: i32) {
        if !self.active {
            warn!("[Minigame] Cannot add score, game not active.");
            return;
        }

        self.score += points;
        self.events.score_changed.publish(&self.score);
        info!("[Minigame] Score: {}/{}", self.score, self.config.win_score);

        if self.score >= self.config.win_score {
            self.end_game(true);
        }
    }

    /// Run the round timer. Running out of time loses the round.
    pub fn tick(&mut self, delta: f32) {
        if !self.active {
            return;
        }
        self.time_left -= delta;
        if self.time_left <= 0.0 {
            self.time_left = 0.0;
            self.end_game(false);
        }
    }

    pub fn end_game(&mut self, won: bool) {
        if !self.active {
            return;
        }
        self.active = false;
        self.last_result = Some(won);
        self.events.minigame_ended.publish(&won);

        let result = if won { "WON" } else { "LOST" };
        info!(
            "[Minigame] Round {} ended: {}! Score: {}",
            self.round, result, self.score
        );

        let out_of_rounds = self.config.max_rounds > 0 && self.round >= self.config.max_rounds;
        if won || out_of_rounds {
            self.game_over = true;
            info!("[Minigame] Game Over!");
        }
    }

    /// Back to a fresh game: no rounds played, score zero.
    pub fn reset(&mut self) {
        self.score = 0;
        self.time_left = self.config.game_time;
        self.round = 0;
        self.active = false;
        self.game_over = false;
        self.last_result = None;
        self.events.score_changed.publish(&self.score);
    }

    /// Count every `target_hit` toward the running round.
    pub fn subscribe(this: &Rc<RefCell<Self>>) -> SubscriptionId {
        let weak = Rc::downgrade(this);
        let events = Rc::clone(&this.borrow().events);
        events.target_hit.subscribe(move |points| {
            let Some(manager) = weak.upgrade() else { return };
            let Ok(mut manager) = manager.try_borrow_mut() else {
                warn!(points = *points, "Minigame manager busy, dropping hit");
                return;
            };
            manager.add_score(*points);
        })
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn time_left(&self) -> f32 {
        self.time_left
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Outcome of the last finished round
    pub fn last_result(&self) -> Option<bool> {
        self.last_result
    }

    pub fn config(&self) -> &MinigameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    fn manager(config: MinigameConfig) -> (MinigameManager, Rc<EventBus>) {
        let events = Rc::new(EventBus::new());
        (MinigameManager::new(config, Rc::clone(&events)), events)
    }

    #[test]
    fn test_score_ignored_before_start() {
        let (mut game, _events) = manager(MinigameConfig::default());
        game.add_score(10);
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn test_reaching_win_score_wins() {
        let (mut game, events) = manager(MinigameConfig::default());
        let ended = Rc::new(RefCell::new(Vec::new()));
        {
            let ended = Rc::clone(&ended);
            events
                .minigame_ended
                .subscribe(move |won| ended.borrow_mut().push(*won));
        }

        assert!(game.start_game());
        for _ in 0..5 {
            game.add_score(10);
        }

        assert!(!game.is_active());
        assert!(game.is_game_over());
        assert_eq!(game.last_result(), Some(true));
        assert_eq!(*ended.borrow(), vec![true]);
    }

    #[test]
    fn test_timer_expiry_loses_round() {
        let (mut game, _events) = manager(MinigameConfig {
            game_time: 1.0,
            ..MinigameConfig::default()
        });
        game.start_game();
        game.tick(0.6);
        assert!(game.is_active());
        game.tick(0.6);
        assert!(!game.is_active());
        assert_eq!(game.last_result(), Some(false));
        assert!(!game.is_game_over());
    }

    #[test]
    fn test_game_over_after_last_round() {
        let (mut game, _events) = manager(MinigameConfig {
            game_time: 1.0,
            max_rounds: 2,
            ..MinigameConfig::default()
        });
        for _ in 0..2 {
            assert!(game.start_game());
            game.tick(2.0);
        }
        assert!(game.is_game_over());
        assert!(!game.start_game());

        game.reset();
        assert_eq!(game.round(), 0);
        assert!(game.start_game());
    }

    #[test]
    fn test_start_while_running_is_refused() {
        let (mut game, events) = manager(MinigameConfig::default());
        let starts = Rc::new(Cell::new(0));
        {
            let starts = Rc::clone(&starts);
            events
                .minigame_started
                .subscribe(move |_| starts.set(starts.get() + 1));
        }
        assert!(game.start_game());
        assert!(!game.start_game());
        assert_eq!(starts.get(), 1);
        assert_eq!(game.round(), 1);
    }

    #[test]
    fn test_target_hits_reach_subscribed_manager() {
        let events = Rc::new(EventBus::new());
        let game = Rc::new(RefCell::new(MinigameManager::new(
            MinigameConfig::default(),
            Rc::clone(&events),
        )));
        let scores = Rc::new(RefCell::new(Vec::new()));
        {
            let scores = Rc::clone(&scores);
            events
                .score_changed
                .subscribe(move |score| scores.borrow_mut().push(*score));
        }
        MinigameManager::subscribe(&game);

        game.borrow_mut().start_game();
        events.target_hit.publish(&10);
        events.target_hit.publish(&15);

        assert_eq!(game.borrow().score(), 25);
        assert_eq!(*scores.borrow(), vec![10, 25]);
    }
}
