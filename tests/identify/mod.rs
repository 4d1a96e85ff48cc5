mod concurrency;
mod containers;
mod pipeline;
