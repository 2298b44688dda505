use tracing::info;

use super::controller::NpcController;

/// Something the player can talk to.
pub trait VoiceHandler {
    fn start_listening(&mut self);

    fn stop_listening(&mut self);

    fn is_listening(&self) -> bool;

    /// Handle a transcribed utterance from the player.
    fn process_speech(&mut self, spoken_text: &str);
}

impl VoiceHandler for NpcController {
    fn start_listening(&mut self) {
        info!(npc = %self.display_name(), "NPC listening");
        self.listening = true;
    }

    fn stop_listening(&mut self) {
        info!(npc = %self.display_name(), "NPC stopped listening");
        self.listening = false;
    }

    fn is_listening(&self) -> bool {
        self.listening
    }

    fn process_speech(&mut self, spoken_text: &str) {
        info!(npc = %self.display_name(), text = spoken_text, "NPC heard");
        self.interact();
    }
}
