use nova_domain::PlayerId;

/// Who is driving a store call. Mission workers run as `Scheduler`; player
/// initiated writes (fleet creation, recalls) carry the player id for audit
/// logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ctx {
    Anonymous,
    Scheduler,
    Player(PlayerId),
}

impl Ctx {
    pub fn player(&self) -> Option<PlayerId> {
        match self {
            Ctx::Player(id) => Some(*id),
            _ => None,
        }
    }
}
