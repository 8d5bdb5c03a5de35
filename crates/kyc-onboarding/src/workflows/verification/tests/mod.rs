mod common;
mod routing;
mod sequencer;
