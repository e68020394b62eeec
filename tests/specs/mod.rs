mod support;

mod property_max_iterations;
mod s1_happy_path;
mod s4_idle_timeout;
mod s5_partial_failure;
mod s6_late_subscriber_replay;
mod stop_run_destroys_sandboxes;
