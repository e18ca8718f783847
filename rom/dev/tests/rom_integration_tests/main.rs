// Licensed under the Apache-2.0 license

mod helpers;

mod test_boot_flow;
mod test_image_verification;
