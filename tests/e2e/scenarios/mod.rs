mod fixtures;
mod happy_path;
mod load_failure;
mod suite_hooks;
