mod binding;
mod helpers;
mod posture;
