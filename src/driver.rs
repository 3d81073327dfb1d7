use crate::{
    autonext::{AdvanceListener, AutonextHandle},
    device::{DerivationPath, DeviceClient, response},
    eip712::{domain_separator, struct_hash},
    eip712_filter::{Eip712FilterParams, Eip712FilterType},
    error::{Error, Result},
    message::TypedDataModel,
    navigator::{Capture, DeviceClass, NavIns, Navigator},
    oracle::Signature,
    resolver::Resolution,
};
use crate::consts::EIP712_DOMAIN_TYPE_NAME;
use log::{debug, info, warn};
use std::{
    path::PathBuf,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Per-run flags
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScenarioOptions {
    /// Directory holding the reference screens of this scenario
    pub snapshots: Option<PathBuf>,
    pub golden_run: bool,
    /// The review opens on the blind-signing warning
    pub validate_warning: bool,
    /// Leave the review early through the skip button
    pub skip_flow: bool,
}

/// Bookkeeping of one run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScenarioContext {
    pub step: usize,
    pub snapshots: Option<PathBuf>,
    pub golden_run: bool,
    pub validate_warning: bool,
    pub skip_flow: bool,
    /// First navigation failure seen by the advance handler
    pub failure: Option<String>,
}

impl ScenarioContext {
    pub fn new(options: &ScenarioOptions) -> Self {
        ScenarioContext {
            step: 0,
            snapshots: options.snapshots.clone(),
            golden_run: options.golden_run,
            validate_warning: options.validate_warning,
            skip_flow: options.skip_flow,
            failure: None,
        }
    }

    pub fn capture(&self) -> Option<Capture> {
        self.snapshots.as_ref().map(|dir| Capture {
            dir: dir.clone(),
            start_idx: self.step,
            golden: self.golden_run,
        })
    }
}

/// Navigation performed on every screen change
pub struct AdvanceHandler<N> {
    class: DeviceClass,
    navigator: Arc<Mutex<N>>,
    context: Arc<Mutex<ScenarioContext>>,
}

impl<N> AdvanceHandler<N> {
    pub fn new(class: DeviceClass, navigator: Arc<Mutex<N>>, context: Arc<Mutex<ScenarioContext>>) -> Self {
        AdvanceHandler {
            class,
            navigator,
            context,
        }
    }
}

impl<N: Navigator + Send> AdvanceListener for AdvanceHandler<N> {
    fn on_advance(&self, handle: &AutonextHandle) -> Result<()> {
        let mut context = lock(&self.context);

        let moves: Vec<NavIns> = match self.class.skip_moves() {
            _ if context.step == 0 && context.validate_warning => vec![self.class.warning_move()],
            Some(skip) if context.skip_flow && context.step == 2 => {
                handle.disarm();
                skip.to_vec()
            }
            _ => vec![self.class.next_move()],
        };

        let capture = context.capture();
        debug!("step {}: {:?}", context.step, moves);
        if let Err(e) = lock(&self.navigator).navigate(&moves, capture.as_ref()) {
            context.failure.get_or_insert_with(|| e.to_string());
            return Err(e);
        }
        context.step += moves.len();
        Ok(())
    }
}

/// Result of a device review
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisclosureOutcome {
    pub signature: Signature,
    /// Navigation steps taken on screen-change events
    pub steps: usize,
    pub autonext_disarms: usize,
}

pub struct DisclosureDriver<N> {
    class: DeviceClass,
    navigator: Arc<Mutex<N>>,
    path: DerivationPath,
}

impl<N: Navigator + Send + 'static> DisclosureDriver<N> {
    pub fn new(class: DeviceClass, navigator: Arc<Mutex<N>>, path: DerivationPath) -> Self {
        DisclosureDriver {
            class,
            navigator,
            path,
        }
    }

    pub fn class(&self) -> DeviceClass {
        self.class
    }

    pub fn path(&self) -> &DerivationPath {
        &self.path
    }

    pub fn navigator(&self) -> &Arc<Mutex<N>> {
        &self.navigator
    }

    /// Stream the message and its filters, review it on the device and
    /// collect the signature
    pub fn sign_typed_data<D: DeviceClient>(
        &self,
        device: &mut D,
        model: &TypedDataModel,
        resolution: &Resolution,
        options: &ScenarioOptions,
    ) -> Result<DisclosureOutcome> {
        let context = Arc::new(Mutex::new(ScenarioContext::new(options)));
        let handle = AutonextHandle::new(Arc::new(AdvanceHandler::new(
            self.class,
            self.navigator.clone(),
            context.clone(),
        )));
        device.set_autonext(Some(handle.clone()));

        let res = self.review(device, model, resolution, &context);

        // stray events must not reach the next scenario
        handle.disarm();
        handle.quiesce();
        device.set_autonext(None);
        let finished = std::mem::take(&mut *lock(&context));

        let signature = match (res, finished.failure) {
            (Ok(signature), None) => signature,
            (Ok(_), Some(failure)) => return Err(Error::Navigation(failure)),
            (Err(e), _) => {
                warn!("review failed after {} steps: {}", finished.step, e);
                return Err(e);
            }
        };
        info!(
            "message signed after {} steps, autonext disarmed {} time(s)",
            finished.step,
            handle.disarm_count()
        );
        Ok(DisclosureOutcome {
            signature,
            steps: finished.step,
            autonext_disarms: handle.disarm_count(),
        })
    }

    fn review<D: DeviceClient>(
        &self,
        device: &mut D,
        model: &TypedDataModel,
        resolution: &Resolution,
        context: &Mutex<ScenarioContext>,
    ) -> Result<Signature> {
        for (name, fields) in model.struct_defs() {
            device.provide_struct_definition(name, fields)?.check()?;
        }

        if resolution.is_filtered() {
            device
                .provide_filter(&Eip712FilterParams::new(Eip712FilterType::Activation))?
                .check()?;
        }
        device
            .provide_struct_implementation(EIP712_DOMAIN_TYPE_NAME, &model.domain_stream()?)?
            .check()?;
        device
            .provide_struct_implementation(model.primary_type(), &model.message_stream()?)?
            .check()?;

        let frames = resolution.frames().map_err(Error::schema)?;
        debug!("streaming {} filter frames", frames.len());
        for frame in &frames {
            device.provide_filter(frame)?.check()?;
        }

        device.sign_typed_data_v2(&self.path)?.check()?;

        let review = self.class.review_moves();
        let capture = lock(context).capture();
        lock(&self.navigator).navigate_until_text(review.nav, &review.validate, review.text, capture.as_ref())?;

        let data = device.response()?.into_data()?;
        response::signature(&data)
    }

    /// Review and sign a pre-hashed message
    pub fn sign_legacy<D: DeviceClient>(
        &self,
        device: &mut D,
        model: &TypedDataModel,
        options: &ScenarioOptions,
    ) -> Result<Signature> {
        let domain_hash = domain_separator(model)?;
        let message_hash = struct_hash(model)?;
        device
            .sign_legacy_typed_data(&self.path, &domain_hash, &message_hash)?
            .check()?;

        let capture = ScenarioContext::new(options).capture();
        lock(&self.navigator).navigate(&self.class.legacy_moves(), capture.as_ref())?;

        let data = device.response()?.into_data()?;
        response::signature(&data)
    }
}
