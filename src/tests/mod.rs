mod compress_properties;
mod strategies;
