

mod timer;

mod flags;
