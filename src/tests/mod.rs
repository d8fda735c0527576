mod bootstrap;
mod support;
